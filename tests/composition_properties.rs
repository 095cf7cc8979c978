//! Behavioural properties of node composition, exercised through the public API.

use std::cell::RefCell;
use std::rc::Rc;

use lazypipe::{Flow, Node, SourceNode, TransformFactory};

fn echo(item: &'static str) -> SourceNode<&'static str> {
    let make = lazypipe::SourceFactory::new("echo", |item: &&'static str| vec![*item]);
    make.bind(item)
}

fn grep(needle: &'static str) -> Node<&'static str, &'static str> {
    let make = TransformFactory::new("grep", |input: Flow<&'static str>, needle: &&'static str| {
        let needle = *needle;
        input.filter(move |line| line.contains(needle))
    });
    make.bind(needle)
}

fn add(amount: i32) -> Node<i32, i32> {
    Node::transform("add", move |input: Flow<i32>| input.map(move |x| x + amount))
}

fn double() -> Node<i32, i32> {
    Node::transform("double", |input: Flow<i32>| input.map(|x| x * 2))
}

#[test]
fn test_construction_is_lazy() {
    let log = Rc::new(RefCell::new(Vec::new()));
    let calls = Rc::clone(&log);
    let noisy = Node::transform("noisy", move |input: Flow<i32>| {
        calls.borrow_mut().push("called");
        input
    });

    let pipeline = Node::source("nums", || 1..=3) | noisy | add(1) | double();
    assert!(log.borrow().is_empty());

    let mut flow = pipeline.iter();
    assert!(log.borrow().is_empty());

    assert_eq!(flow.next(), Some(4));
    assert_eq!(log.borrow().len(), 1);
}

#[test]
fn test_sequential_composition_is_associative() {
    let source = Node::source("nums", || vec![1, 2, 3]);

    let left = (source.clone() | add(1)) | double();
    let right = source | (add(1) | double());

    assert_eq!(
        left.iter().collect::<Vec<_>>(),
        right.iter().collect::<Vec<_>>()
    );
    assert_eq!(left.iter().collect::<Vec<_>>(), vec![4, 6, 8]);
    assert_eq!(left.name(), right.name());
}

#[test]
fn test_deep_chain_stays_streaming() {
    let mut pipeline = Node::source("naturals", || 0..);
    for _ in 0..200 {
        pipeline = pipeline | add(1);
    }
    let first: Vec<i32> = pipeline.iter().take(3).collect();
    assert_eq!(first, vec![200, 201, 202]);
}

#[test]
fn test_reiteration_yields_fresh_results() {
    let node = Node::source("pair", || {
        let mut emitted = Vec::new();
        emitted.push(1);
        emitted.push(2);
        emitted
    });
    assert_eq!(node.iter().collect::<Vec<_>>(), vec![1, 2]);
    assert_eq!(node.iter().collect::<Vec<_>>(), vec![1, 2]);
}

#[test]
fn test_cross_product_ordering() {
    let product = Node::source("a", || vec![0, 1]) * Node::source("b", || vec![9, 10]);
    assert_eq!(
        product.iter().collect::<Vec<_>>(),
        vec![(0, 9), (0, 10), (1, 9), (1, 10)]
    );
}

#[test]
fn test_concatenation_ordering() {
    let sum = Node::source("a", || vec![1, 2, 3]) + Node::source("b", || vec![4, 5, 6]);
    assert_eq!(sum.iter().collect::<Vec<_>>(), vec![1, 2, 3, 4, 5, 6]);
}

#[test]
fn test_shared_input_fan_out() {
    let pass = || Node::transform("pass", |input: Flow<i32>| input);
    let pipeline = Node::source("src", || vec![1, 2, 3]) | (pass() + pass());
    assert_eq!(pipeline.iter().collect::<Vec<_>>(), vec![1, 2, 3, 1, 2, 3]);
}

#[test]
fn test_shared_input_product() {
    let pipeline = Node::source("src", || vec![1, 2]) | (add(0) * add(10));
    assert_eq!(
        pipeline.iter().collect::<Vec<_>>(),
        vec![(1, 11), (1, 12), (2, 11), (2, 12)]
    );
}

#[test]
fn test_naming() {
    assert_eq!(echo("x").name(), "echo");
    assert_eq!((echo("x") | grep("x")).name(), "echo | grep");
    assert_eq!((echo("x") + echo("y")).name(), "echo + echo");
    assert_eq!(
        (echo("cat") * echo("dog")).iter().collect::<Vec<_>>(),
        vec![("cat", "dog")]
    );

    let grep_a = grep("a");
    let grep_b = grep("bbb");
    assert_eq!((grep_a.clone() * grep_b.clone()).name(), "grep * grep");
    assert_eq!((grep_a.clone() + grep_b).name(), "grep + grep");

    let mixed = Node::source_for("echo", || vec!["cat"]);
    assert_eq!((mixed.clone() * grep_a.clone()).name(), "echo * grep");
    assert_eq!((mixed + grep_a).name(), "echo + grep");
}

#[test]
fn test_stage_errors_reach_the_caller() {
    let parse = Node::transform("parse", |input: Flow<&'static str>| {
        input.map(|text| text.parse::<i32>())
    });
    let pipeline = Node::source("text", || vec!["1", "x", "3"]) | parse;

    let result: Result<Vec<i32>, _> = pipeline.iter().collect();
    assert!(result.is_err());

    let mut flow = pipeline.iter();
    assert_eq!(flow.next(), Some(Ok(1)));
    assert!(matches!(flow.next(), Some(Err(_))));
}

#[test]
fn test_abandoned_flow_drops_stage_state() {
    struct Guard(Rc<RefCell<bool>>);
    impl Drop for Guard {
        fn drop(&mut self) {
            *self.0.borrow_mut() = true;
        }
    }

    let released = Rc::new(RefCell::new(false));
    let flag = Rc::clone(&released);
    let source = Node::source("guarded", move || {
        let guard = Guard(Rc::clone(&flag));
        (0..).map(move |x| {
            let _held = &guard;
            x
        })
    });

    let mut flow = (source | add(1)).iter();
    assert_eq!(flow.next(), Some(1));
    assert!(!*released.borrow());
    drop(flow);
    assert!(*released.borrow());
}
