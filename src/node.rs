//! Pipeline nodes and their composition operators.
//!
//! A [`Node`] pairs one stage function with a display name. Nodes are
//! immutable: every combinator returns a new node and leaves its operands
//! untouched. Nothing runs until a node is iterated, and every iteration
//! re-runs the stage from scratch.

use std::fmt;
use std::iter;
use std::ops::{Add, BitOr, Mul};
use std::rc::Rc;

use crate::error::{PipelineError, Result};
use crate::fanout;

/// A lazy, single-pass sequence of items.
pub type Flow<T> = Box<dyn Iterator<Item = T>>;

/// A node whose stage takes no input.
pub type SourceNode<O> = Node<(), O>;

type SourceFn<O> = Rc<dyn Fn() -> Flow<O>>;
type TransformFn<I, O> = Rc<dyn Fn(Flow<I>) -> Flow<O>>;

/// The function wrapped by a node, tagged by its input shape.
pub enum Stage<I, O> {
    /// Produces items without upstream input.
    Source(SourceFn<O>),
    /// Consumes exactly one upstream flow.
    Transform(TransformFn<I, O>),
}

impl<I, O> Stage<I, O> {
    pub fn is_source(&self) -> bool {
        matches!(self, Stage::Source(_))
    }

    fn kind(&self) -> &'static str {
        match self {
            Stage::Source(_) => "source",
            Stage::Transform(_) => "transform",
        }
    }
}

impl<I: 'static, O: 'static> Stage<I, O> {
    /// Run the stage. A source ignores `input`; a transform without input
    /// sees an empty flow.
    fn invoke(&self, input: Option<Flow<I>>) -> Flow<O> {
        match self {
            Stage::Source(f) => f(),
            Stage::Transform(f) => f(input.unwrap_or_else(|| Box::new(iter::empty()))),
        }
    }
}

impl<I, O> Clone for Stage<I, O> {
    fn clone(&self) -> Self {
        match self {
            Stage::Source(f) => Stage::Source(Rc::clone(f)),
            Stage::Transform(f) => Stage::Transform(Rc::clone(f)),
        }
    }
}

/// Postpones a stage function call until its flow is first pulled.
struct Deferred<T> {
    name: Rc<str>,
    start: Option<Box<dyn FnOnce() -> Flow<T>>>,
    flow: Option<Flow<T>>,
}

impl<T> Iterator for Deferred<T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        if let Some(start) = self.start.take() {
            tracing::trace!(stage = %self.name, "stage started");
            self.flow = Some(start());
        }
        self.flow.as_mut()?.next()
    }
}

fn deferred<T: 'static>(name: &Rc<str>, start: impl FnOnce() -> Flow<T> + 'static) -> Flow<T> {
    Box::new(Deferred {
        name: Rc::clone(name),
        start: Some(Box::new(start)),
        flow: None,
    })
}

/// A named, composable pipeline stage.
pub struct Node<I, O> {
    name: Rc<str>,
    stage: Stage<I, O>,
}

impl<I, O> Clone for Node<I, O> {
    fn clone(&self) -> Self {
        Self {
            name: Rc::clone(&self.name),
            stage: self.stage.clone(),
        }
    }
}

impl<O: 'static> Node<(), O> {
    /// Wrap a zero-input stage function.
    pub fn source<F, S>(name: impl Into<Rc<str>>, f: F) -> Self
    where
        F: Fn() -> S + 'static,
        S: IntoIterator<Item = O>,
        S::IntoIter: 'static,
    {
        Self::source_for(name, f)
    }

    /// View this node as one accepting input of any type `I`.
    ///
    /// A source ignores input, so its stage is shared unchanged. A transform
    /// over unit items receives one `()` per incoming item.
    pub fn accepting<I: 'static>(&self) -> Node<I, O> {
        let stage = match &self.stage {
            Stage::Source(f) => Stage::Source(Rc::clone(f)),
            Stage::Transform(f) => {
                let f = Rc::clone(f);
                let g: TransformFn<I, O> =
                    Rc::new(move |input: Flow<I>| f(Box::new(input.map(|_| ()))));
                Stage::Transform(g)
            }
        };
        Node {
            name: Rc::clone(&self.name),
            stage,
        }
    }
}

impl<I: 'static, O: 'static> Node<I, O> {
    /// Wrap a zero-input stage function as a node that can sit beside
    /// transforms consuming `I`.
    pub fn source_for<F, S>(name: impl Into<Rc<str>>, f: F) -> Self
    where
        F: Fn() -> S + 'static,
        S: IntoIterator<Item = O>,
        S::IntoIter: 'static,
    {
        let name = name.into();
        let label = Rc::clone(&name);
        let f = Rc::new(f);
        let stage: SourceFn<O> = Rc::new(move || {
            let f = Rc::clone(&f);
            deferred(&label, move || Box::new(f().into_iter()))
        });
        Self {
            name,
            stage: Stage::Source(stage),
        }
    }

    /// Wrap a stage function consuming one upstream flow.
    pub fn transform<F, S>(name: impl Into<Rc<str>>, f: F) -> Self
    where
        F: Fn(Flow<I>) -> S + 'static,
        S: IntoIterator<Item = O>,
        S::IntoIter: 'static,
    {
        let name = name.into();
        let label = Rc::clone(&name);
        let f = Rc::new(f);
        let stage: TransformFn<I, O> = Rc::new(move |input| {
            let f = Rc::clone(&f);
            deferred(&label, move || Box::new(f(input).into_iter()))
        });
        Self {
            name,
            stage: Stage::Transform(stage),
        }
    }

    fn composed(name: String, stage: Stage<I, O>) -> Self {
        Self {
            name: name.into(),
            stage,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn stage(&self) -> &Stage<I, O> {
        &self.stage
    }

    pub fn is_source(&self) -> bool {
        self.stage.is_source()
    }

    /// Start a fresh run of this node.
    ///
    /// A transform iterated on its own receives an empty input flow.
    pub fn iter(&self) -> Flow<O> {
        self.stage.invoke(None)
    }

    /// Run this transform over an external iterator.
    ///
    /// # Panics
    ///
    /// Panics if the node is a source, since a source accepts no input.
    pub fn feed<U>(&self, input: U) -> Flow<O>
    where
        U: IntoIterator<Item = I>,
        U::IntoIter: 'static,
    {
        assert!(
            !self.is_source(),
            "cannot feed input into `{}`: a source stage accepts no input",
            self.name
        );
        self.stage.invoke(Some(Box::new(input.into_iter())))
    }

    /// Sequential composition: `next` consumes this node's output.
    ///
    /// Fails if `next` is a source.
    pub fn try_then<P: 'static>(&self, next: &Node<O, P>) -> Result<Node<I, P>> {
        let Stage::Transform(downstream) = &next.stage else {
            return Err(PipelineError::SourceDownstream {
                upstream: self.name.to_string(),
                downstream: next.name.to_string(),
            });
        };
        let downstream = Rc::clone(downstream);
        let name = format!("{} | {}", self.name, next.name);

        let stage = match &self.stage {
            Stage::Source(upstream) => {
                let upstream = Rc::clone(upstream);
                let f: SourceFn<P> = Rc::new(move || downstream(upstream()));
                Stage::Source(f)
            }
            Stage::Transform(upstream) => {
                let upstream = Rc::clone(upstream);
                let f: TransformFn<I, P> = Rc::new(move |input| downstream(upstream(input)));
                Stage::Transform(f)
            }
        };
        Ok(Node::composed(name, stage))
    }

    /// Sequential composition, the `|` operator.
    ///
    /// # Panics
    ///
    /// Panics if `next` is a source. Use [`Node::try_then`] to handle that
    /// case as an error.
    pub fn then<P: 'static>(&self, next: &Node<O, P>) -> Node<I, P> {
        match self.try_then(next) {
            Ok(node) => node,
            Err(err) => panic!("{err}"),
        }
    }

    /// Cross product, the `*` operator: every `(a, b)` pair in row-major order.
    ///
    /// `other` runs once per product run; its items are cached during the
    /// first row and replayed for the following rows.
    pub fn cross_with<P>(&self, other: &Node<I, P>) -> Node<I, (O, P)>
    where
        I: Clone,
        O: Clone,
        P: Clone + 'static,
    {
        let name = format!("{} * {}", self.name, other.name);
        Node::joined(
            name,
            self.stage.clone(),
            other.stage.clone(),
            |left, right| -> Flow<(O, P)> { Box::new(Product::new(left, right)) },
        )
    }

    /// Concatenation, the `+` operator: all of this node's output, then all of `other`'s.
    pub fn chain_with(&self, other: &Node<I, O>) -> Node<I, O>
    where
        I: Clone,
    {
        let name = format!("{} + {}", self.name, other.name);
        Node::joined(
            name,
            self.stage.clone(),
            other.stage.clone(),
            |left, right| -> Flow<O> { Box::new(left.chain(right)) },
        )
    }

    /// Build a two-operand combinator. The result is a source only when
    /// both operands are; otherwise incoming input is routed to the
    /// transform operands, split when both need it.
    fn joined<A, B>(
        name: String,
        left: Stage<I, A>,
        right: Stage<I, B>,
        join: fn(Flow<A>, Flow<B>) -> Flow<O>,
    ) -> Self
    where
        I: Clone,
        A: 'static,
        B: 'static,
    {
        let stage = if left.is_source() && right.is_source() {
            let f: SourceFn<O> = Rc::new(move || join(left.invoke(None), right.invoke(None)));
            Stage::Source(f)
        } else {
            let f: TransformFn<I, O> = Rc::new(move |input| {
                let (to_left, to_right) = route(&left, &right, input);
                join(left.invoke(to_left), right.invoke(to_right))
            });
            Stage::Transform(f)
        };
        Node::composed(name, stage)
    }
}

/// Hand the input to whichever operands consume it, fanning it out when both do.
fn route<I, A, B>(
    left: &Stage<I, A>,
    right: &Stage<I, B>,
    input: Flow<I>,
) -> (Option<Flow<I>>, Option<Flow<I>>)
where
    I: Clone + 'static,
{
    match (left.is_source(), right.is_source()) {
        (false, false) => {
            let (a, b) = fanout::split(input);
            (Some(Box::new(a)), Some(Box::new(b)))
        }
        (false, true) => (Some(input), None),
        (true, false) => (None, Some(input)),
        (true, true) => (None, None),
    }
}

/// Row-major cartesian product over two flows.
struct Product<A, B> {
    left: Flow<A>,
    right: Flow<B>,
    right_done: bool,
    seen: Vec<B>,
    current: Option<A>,
    index: usize,
}

impl<A, B> Product<A, B> {
    fn new(left: Flow<A>, right: Flow<B>) -> Self {
        Self {
            left,
            right,
            right_done: false,
            seen: Vec::new(),
            current: None,
            index: 0,
        }
    }
}

impl<A: Clone, B: Clone> Iterator for Product<A, B> {
    type Item = (A, B);

    fn next(&mut self) -> Option<(A, B)> {
        loop {
            if self.current.is_none() {
                if self.right_done && self.seen.is_empty() {
                    return None;
                }
                self.current = Some(self.left.next()?);
                self.index = 0;
            }
            let left = self.current.as_ref()?;

            if let Some(right) = self.seen.get(self.index) {
                self.index += 1;
                return Some((left.clone(), right.clone()));
            }
            if !self.right_done {
                match self.right.next() {
                    Some(right) => {
                        self.seen.push(right.clone());
                        self.index += 1;
                        return Some((left.clone(), right));
                    }
                    None => self.right_done = true,
                }
            }
            self.current = None;
        }
    }
}

impl<I: 'static, O: 'static> IntoIterator for &Node<I, O> {
    type Item = O;
    type IntoIter = Flow<O>;

    fn into_iter(self) -> Flow<O> {
        self.iter()
    }
}

impl<I: 'static, M: 'static, O: 'static> BitOr<Node<M, O>> for Node<I, M> {
    type Output = Node<I, O>;

    fn bitor(self, rhs: Node<M, O>) -> Node<I, O> {
        self.then(&rhs)
    }
}

impl<I, O, P> Mul<Node<I, P>> for Node<I, O>
where
    I: Clone + 'static,
    O: Clone + 'static,
    P: Clone + 'static,
{
    type Output = Node<I, (O, P)>;

    fn mul(self, rhs: Node<I, P>) -> Node<I, (O, P)> {
        self.cross_with(&rhs)
    }
}

impl<I: Clone + 'static, O: 'static> Add for Node<I, O> {
    type Output = Node<I, O>;

    fn add(self, rhs: Node<I, O>) -> Node<I, O> {
        self.chain_with(&rhs)
    }
}

impl<I, O> fmt::Display for Node<I, O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

impl<I, O> fmt::Debug for Node<I, O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("name", &self.name)
            .field("stage", &self.stage.kind())
            .finish()
    }
}
