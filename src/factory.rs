//! Stage wrappers: define a stage once, bind its configuration later.
//!
//! A factory holds the stage body and its name. [`SourceFactory::bind`] and
//! [`TransformFactory::bind`] attach concrete configuration and return a
//! node; the body itself only runs when that node is iterated.

use std::rc::Rc;

use crate::node::{Flow, Node, SourceNode};

/// Builds source nodes from a body taking configuration `C`.
pub struct SourceFactory<C, O> {
    name: Rc<str>,
    body: Rc<dyn Fn(&C) -> Flow<O>>,
}

impl<C: 'static, O: 'static> SourceFactory<C, O> {
    pub fn new<F, S>(name: impl Into<Rc<str>>, body: F) -> Self
    where
        F: Fn(&C) -> S + 'static,
        S: IntoIterator<Item = O>,
        S::IntoIter: 'static,
    {
        Self {
            name: name.into(),
            body: Rc::new(move |config| Box::new(body(config).into_iter())),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// A node running the body with `config`, named after the factory.
    pub fn bind(&self, config: C) -> SourceNode<O> {
        let body = Rc::clone(&self.body);
        Node::source(Rc::clone(&self.name), move || body(&config))
    }
}

impl<C, O> Clone for SourceFactory<C, O> {
    fn clone(&self) -> Self {
        Self {
            name: Rc::clone(&self.name),
            body: Rc::clone(&self.body),
        }
    }
}

/// Builds transform nodes from a body taking the upstream flow and configuration `C`.
pub struct TransformFactory<C, I, O> {
    name: Rc<str>,
    body: Rc<dyn Fn(Flow<I>, &C) -> Flow<O>>,
}

impl<C: 'static, I: 'static, O: 'static> TransformFactory<C, I, O> {
    pub fn new<F, S>(name: impl Into<Rc<str>>, body: F) -> Self
    where
        F: Fn(Flow<I>, &C) -> S + 'static,
        S: IntoIterator<Item = O>,
        S::IntoIter: 'static,
    {
        Self {
            name: name.into(),
            body: Rc::new(move |input, config| Box::new(body(input, config).into_iter())),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// A node running the body over its input with `config`, named after the factory.
    pub fn bind(&self, config: C) -> Node<I, O> {
        let body = Rc::clone(&self.body);
        Node::transform(Rc::clone(&self.name), move |input| body(input, &config))
    }
}

impl<C, I, O> Clone for TransformFactory<C, I, O> {
    fn clone(&self) -> Self {
        Self {
            name: Rc::clone(&self.name),
            body: Rc::clone(&self.body),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_source_factory_binds_config() {
        let range = SourceFactory::new("range", |&(start, end): &(u32, u32)| start..end);
        let node = range.bind((2, 5));
        assert_eq!(node.name(), "range");
        assert_eq!(node.iter().collect::<Vec<_>>(), vec![2, 3, 4]);
    }

    #[test]
    fn test_transform_factory_binds_config() {
        let add = TransformFactory::new("add", |input: Flow<i64>, amount: &i64| {
            let amount = *amount;
            input.map(move |x| x + amount)
        });
        let plus_three = add.bind(3);
        let plus_ten = add.bind(10);

        assert_eq!(plus_three.feed(vec![1, 2]).collect::<Vec<_>>(), vec![4, 5]);
        assert_eq!(plus_ten.feed(vec![1, 2]).collect::<Vec<_>>(), vec![11, 12]);
        assert_eq!(plus_three.name(), "add");
        assert_eq!(plus_ten.name(), "add");
    }

    #[test]
    fn test_bind_does_not_run_body() {
        let calls = Rc::new(Cell::new(0));
        let counter = Rc::clone(&calls);
        let factory = SourceFactory::new("counted", move |n: &usize| {
            counter.set(counter.get() + 1);
            vec![0; *n]
        });

        let node = factory.bind(3);
        assert_eq!(calls.get(), 0);
        assert_eq!(node.iter().count(), 3);
        assert_eq!(node.iter().count(), 3);
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn test_bound_nodes_compose() {
        let words = SourceFactory::new("words", |text: &String| {
            text.split_whitespace()
                .map(str::to_string)
                .collect::<Vec<_>>()
        });
        let longer = TransformFactory::new("longer", |input: Flow<String>, min: &usize| {
            let min = *min;
            input.filter(move |w| w.len() > min)
        });

        let pipeline = words.bind("a bb ccc dddd".to_string()) | longer.bind(2);
        assert_eq!(pipeline.name(), "words | longer");
        assert_eq!(pipeline.iter().collect::<Vec<_>>(), vec!["ccc", "dddd"]);
    }
}
