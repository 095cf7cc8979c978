//! Item-generic stages: mapping, filtering, slicing and printing.

use std::cell::RefCell;
use std::fmt::Debug;
use std::io::{self, Write};
use std::iter;
use std::rc::Rc;

use lazypipe::{Flow, Node};

/// Apply `f` to every item.
pub fn map<T: 'static, U: 'static>(f: impl Fn(T) -> U + 'static) -> Node<T, U> {
    let f = Rc::new(f);
    Node::transform("map", move |input: Flow<T>| {
        let f = Rc::clone(&f);
        input.map(move |item| f(item))
    })
}

/// Keep the items for which `predicate` holds.
pub fn filter<T: 'static>(predicate: impl Fn(&T) -> bool + 'static) -> Node<T, T> {
    let predicate = Rc::new(predicate);
    Node::transform("filter", move |input: Flow<T>| {
        let predicate = Rc::clone(&predicate);
        input.filter(move |item| predicate(item))
    })
}

lazypipe::transform! {
    /// Pass through at most the first `n` items.
    pub fn take<T>(input: T, n: usize) -> T {
        input.take(n)
    }
}

lazypipe::transform! {
    /// Drop the first `n` items.
    pub fn skip<T>(input: T, n: usize) -> T {
        input.skip(n)
    }
}

lazypipe::transform! {
    /// Drain the input and yield how many items it held.
    pub fn count<T>(input: T) -> usize {
        iter::once(input.count())
    }
}

/// Print each item's pretty debug form to stdout and pass it on unchanged.
pub fn pretty_printer<T: Debug + 'static>() -> Node<T, T> {
    Node::transform("pretty_printer", |input: Flow<T>| {
        input.inspect(|item| {
            if let Err(err) = writeln!(io::stdout().lock(), "{item:#?}") {
                tracing::warn!(error = %err, "pretty_printer could not write item");
            }
        })
    })
}

/// Like [`pretty_printer`], writing to a shared writer instead of stdout.
pub fn pretty_printer_to<T, W>(out: Rc<RefCell<W>>) -> Node<T, T>
where
    T: Debug + 'static,
    W: Write + 'static,
{
    Node::transform("pretty_printer", move |input: Flow<T>| {
        let out = Rc::clone(&out);
        input.inspect(move |item| {
            if let Err(err) = writeln!(out.borrow_mut(), "{item:#?}") {
                tracing::warn!(error = %err, "pretty_printer could not write item");
            }
        })
    })
}
