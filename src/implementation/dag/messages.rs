// Copyright 2020 Xavier Gillard
//
// Permission is hereby granted, free of charge, to any person obtaining a copy of
// this software and associated documentation files (the "Software"), to deal in
// the Software without restriction, including without limitation the rights to
// use, copy, modify, merge, publish, distribute, sublicense, and/or sell copies of
// the Software, and to permit persons to whom the Software is furnished to do so,
// subject to the following conditions:
//
// The above copyright notice and this permission notice shall be included in all
// copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
// IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY, FITNESS
// FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE AUTHORS OR
// COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER LIABILITY, WHETHER
// IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM, OUT OF OR IN
// CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE SOFTWARE.

//! This module defines the payloads exchanged along the edges of the
//! invariant graph. A node talks to its children either with a `Full`
//! message (its complete recomputed output, as happens at initialization) or
//! with a `Delta` (the signed change since the last full message, which is
//! what the incremental evaluation thrives on). Every invariant accepts
//! both kinds.

/// One message flowing along a graph edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Message {
    /// The complete output value of the emitting node
    Full(isize),
    /// The signed change of the emitting node's output since its last
    /// committed value
    Delta(isize),
}

impl Message {
    /// The output value the emitter now stands at, given the value it had
    /// previously committed
    #[inline]
    pub fn value_after(self, previous: isize) -> isize {
        match self {
            Message::Full(value) => value,
            Message::Delta(change) => previous + change,
        }
    }
}

/// The change of one input of an invariant, as seen from the receiving
/// node: which of its parents moved (by position in its parent list), and
/// the old and new values of that parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParentDelta {
    /// The position of the parent in the receiver's parent list
    pub index: usize,
    /// The parent's committed value
    pub old: isize,
    /// The parent's value under the move being propagated
    pub new: isize,
}

// ############################################################################
// #### TESTS #################################################################
// ############################################################################

#[cfg(test)]
mod tests {
    use super::Message;

    #[test]
    fn full_messages_override_and_deltas_accumulate() {
        assert_eq!(42, Message::Full(42).value_after(17));
        assert_eq!(20, Message::Delta(3).value_after(17));
        assert_eq!(14, Message::Delta(-3).value_after(17));
    }
}
