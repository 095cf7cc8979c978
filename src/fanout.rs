//! Fan-out adaptor: one upstream iterator, several independently paced cursors.
//!
//! Every cursor observes the identical sequence in identical order while the
//! upstream is pulled at most once per item. Items are retained only until
//! the slowest live cursor has moved past them.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

struct Shared<It: Iterator> {
    upstream: It,
    buffer: VecDeque<It::Item>,
    /// Absolute index of `buffer[0]`.
    offset: usize,
    /// Next absolute index per cursor, `None` once that cursor is dropped.
    positions: Vec<Option<usize>>,
    exhausted: bool,
}

impl<It: Iterator> Shared<It> {
    fn new(upstream: It, cursors: usize) -> Self {
        Self {
            upstream,
            buffer: VecDeque::new(),
            offset: 0,
            positions: vec![Some(0); cursors],
            exhausted: false,
        }
    }

    /// Drop every buffered item that all live cursors have consumed.
    fn release(&mut self) {
        let end = self.offset + self.buffer.len();
        let floor = self.positions.iter().flatten().min().copied().unwrap_or(end);
        while self.offset < floor && self.buffer.pop_front().is_some() {
            self.offset += 1;
        }
    }
}

impl<It> Shared<It>
where
    It: Iterator,
    It::Item: Clone,
{
    fn next_for(&mut self, id: usize) -> Option<It::Item> {
        let pos = self.positions[id]?;
        let item = if pos < self.offset + self.buffer.len() {
            self.buffer[pos - self.offset].clone()
        } else if self.exhausted {
            return None;
        } else {
            match self.upstream.next() {
                Some(item) => {
                    self.buffer.push_back(item.clone());
                    item
                }
                None => {
                    self.exhausted = true;
                    return None;
                }
            }
        };
        self.positions[id] = Some(pos + 1);
        self.release();
        Some(item)
    }
}

/// One independent view over a fanned-out upstream.
pub struct Cursor<It: Iterator> {
    shared: Rc<RefCell<Shared<It>>>,
    /// Cursors dropped while `shared` was borrowed, released on the next pull.
    abandoned: Rc<RefCell<Vec<usize>>>,
    id: usize,
}

impl<It: Iterator> Cursor<It> {
    /// Number of upstream items currently held for slower cursors.
    pub fn buffered(&self) -> usize {
        self.shared.borrow().buffer.len()
    }
}

impl<It> Iterator for Cursor<It>
where
    It: Iterator,
    It::Item: Clone,
{
    type Item = It::Item;

    fn next(&mut self) -> Option<Self::Item> {
        let mut shared = self.shared.borrow_mut();
        let item = shared.next_for(self.id);
        let abandoned: Vec<usize> = self.abandoned.borrow_mut().drain(..).collect();
        if !abandoned.is_empty() {
            for id in abandoned {
                shared.positions[id] = None;
            }
            shared.release();
        }
        item
    }
}

impl<It: Iterator> Drop for Cursor<It> {
    fn drop(&mut self) {
        match self.shared.try_borrow_mut() {
            Ok(mut shared) => {
                shared.positions[self.id] = None;
                shared.release();
            }
            // Only reachable when the upstream itself drops a sibling cursor
            // mid-pull.
            Err(_) => {
                tracing::debug!(cursor = self.id, "fan-out busy, deferring cursor release");
                self.abandoned.borrow_mut().push(self.id);
            }
        }
    }
}

/// Split `upstream` into `n` cursors that each yield the full sequence.
pub fn fan_out<U>(upstream: U, n: usize) -> Vec<Cursor<U::IntoIter>>
where
    U: IntoIterator,
{
    let shared = Rc::new(RefCell::new(Shared::new(upstream.into_iter(), n)));
    let abandoned = Rc::new(RefCell::new(Vec::new()));
    (0..n)
        .map(|id| Cursor {
            shared: Rc::clone(&shared),
            abandoned: Rc::clone(&abandoned),
            id,
        })
        .collect()
}

/// Split `upstream` into exactly two cursors.
pub fn split<U>(upstream: U) -> (Cursor<U::IntoIter>, Cursor<U::IntoIter>)
where
    U: IntoIterator,
{
    let shared = Rc::new(RefCell::new(Shared::new(upstream.into_iter(), 2)));
    let abandoned = Rc::new(RefCell::new(Vec::new()));
    let first = Cursor {
        shared: Rc::clone(&shared),
        abandoned: Rc::clone(&abandoned),
        id: 0,
    };
    let second = Cursor {
        shared,
        abandoned,
        id: 1,
    };
    (first, second)
}
