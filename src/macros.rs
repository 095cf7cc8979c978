//! Declarative stage wrappers.
//!
//! `source!` and `transform!` turn a function definition into a constructor
//! of the same name. Calling the constructor with configuration arguments
//! returns a node named after the function; the function body runs only
//! when that node is iterated, once per run, with fresh clones of the
//! configuration arguments.

/// Define a source stage constructor.
///
/// ```
/// lazypipe::source! {
///     /// Count up from `start`, `n` times.
///     fn count_up(start: u32, n: usize) -> u32 {
///         (start..).take(n)
///     }
/// }
///
/// let node = count_up(5, 3);
/// assert_eq!(node.name(), "count_up");
/// assert_eq!(node.iter().collect::<Vec<_>>(), vec![5, 6, 7]);
/// ```
#[macro_export]
macro_rules! source {
    (
        $(#[$meta:meta])*
        $vis:vis fn $name:ident $(< $($gen:ident $(: $bound:path)?),+ $(,)? >)?
            ( $($arg:ident : $ty:ty),* $(,)? ) -> $item:ty $body:block
    ) => {
        $(#[$meta])*
        $vis fn $name $(< $($gen: 'static $(+ $bound)?),+ >)? ( $($arg: $ty),* ) -> $crate::SourceNode<$item> {
            $crate::Node::source(stringify!($name), move || {
                $(let $arg = ::std::clone::Clone::clone(&$arg);)*
                $body
            })
        }
    };
}

/// Define a transform stage constructor.
///
/// The first parameter names the upstream flow and declares its item type;
/// the remaining parameters become the constructor's arguments.
///
/// ```
/// lazypipe::transform! {
///     fn scale(input: i32, factor: i32) -> i32 {
///         input.map(move |x| x * factor)
///     }
/// }
///
/// let node = scale(3);
/// assert_eq!(node.name(), "scale");
/// assert_eq!(node.feed(vec![1, 2]).collect::<Vec<_>>(), vec![3, 6]);
/// ```
#[macro_export]
macro_rules! transform {
    (
        $(#[$meta:meta])*
        $vis:vis fn $name:ident $(< $($gen:ident $(: $bound:path)?),+ $(,)? >)?
            ( $input:ident : $in:ty $(, $arg:ident : $ty:ty)* $(,)? ) -> $out:ty $body:block
    ) => {
        $(#[$meta])*
        $vis fn $name $(< $($gen: 'static $(+ $bound)?),+ >)? ( $($arg: $ty),* ) -> $crate::Node<$in, $out> {
            $crate::Node::transform(stringify!($name), move |$input: $crate::Flow<$in>| {
                $(let $arg = ::std::clone::Clone::clone(&$arg);)*
                $body
            })
        }
    };
}
