//! The lexical context: a stack of currently-entered scope-bearing nodes.
//!
//! The transform engine pushes a frame when it enters a block or function
//! and pops it when it leaves; flag mutations requested mid-visit accumulate
//! on the frame and are merged into the rebuilt node at pop. Push and pop
//! must balance on every exit path; imbalance is a fatal invariant
//! violation.

use crate::node::{Block, BlockFlags, BlockId, FnId, FunctionFlags, FunctionNode};

#[derive(Debug, Clone)]
pub struct BlockFrame {
    pub id: BlockId,
    pub flags: BlockFlags,
}

#[derive(Debug, Clone)]
pub struct FunctionFrame {
    pub id: FnId,
    pub body_id: BlockId,
    pub flags: FunctionFlags,
    pub name: String,
}

#[derive(Debug, Clone)]
pub enum Frame {
    Block(BlockFrame),
    Function(FunctionFrame),
}

/// Stack of entered scope-bearing nodes, threaded through every pass.
#[derive(Debug, Default)]
pub struct LexicalContext {
    frames: Vec<Frame>,
}

impl LexicalContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn push_block(&mut self, block: &Block) {
        self.frames.push(Frame::Block(BlockFrame {
            id: block.id,
            flags: block.flags,
        }));
    }

    /// Pops the top frame, which must be the block with the given id.
    pub fn pop_block(&mut self, id: BlockId) -> BlockFrame {
        match self.frames.pop() {
            Some(Frame::Block(frame)) if frame.id == id => frame,
            top => panic!("lexical context imbalance: expected block {id:?}, found {top:?}"),
        }
    }

    pub fn push_function(&mut self, function: &FunctionNode) {
        self.frames.push(Frame::Function(FunctionFrame {
            id: function.id,
            body_id: function.body.id,
            flags: function.flags,
            name: function.name.name.clone(),
        }));
    }

    /// Pops the top frame, which must be the function with the given id.
    pub fn pop_function(&mut self, id: FnId) -> FunctionFrame {
        match self.frames.pop() {
            Some(Frame::Function(frame)) if frame.id == id => frame,
            top => panic!("lexical context imbalance: expected function {id:?}, found {top:?}"),
        }
    }

    /// Innermost entered block.
    pub fn current_block(&self) -> &BlockFrame {
        self.frames
            .iter()
            .rev()
            .find_map(|f| match f {
                Frame::Block(b) => Some(b),
                Frame::Function(_) => None,
            })
            .expect("no block on the lexical context")
    }

    /// Innermost entered function.
    pub fn current_function(&self) -> &FunctionFrame {
        self.frames
            .iter()
            .rev()
            .find_map(|f| match f {
                Frame::Function(f) => Some(f),
                Frame::Block(_) => None,
            })
            .expect("no function on the lexical context")
    }

    pub fn outermost_function(&self) -> &FunctionFrame {
        self.frames
            .iter()
            .find_map(|f| match f {
                Frame::Function(f) => Some(f),
                Frame::Block(_) => None,
            })
            .expect("no function on the lexical context")
    }

    /// True iff the current block is the body of the current function.
    pub fn is_function_body(&self) -> bool {
        self.current_block().id == self.current_function().body_id
    }

    /// True iff the current block is directly a case body of a switch,
    /// with no explicit block around the declaration position.
    pub fn in_unprotected_switch_context(&self) -> bool {
        self.current_block().flags.contains(BlockFlags::IS_CASE_BODY)
    }

    /// Frames from innermost to outermost.
    pub fn frames_top_down(&self) -> impl Iterator<Item = &Frame> {
        self.frames.iter().rev()
    }

    /// `block` followed by its enclosing blocks, up to the nearest function
    /// body inclusive.
    pub fn blocks_from(&self, block: BlockId) -> impl Iterator<Item = &BlockFrame> {
        let frames = &self.frames;
        let mut idx = self
            .position_of_block(block)
            .map(|p| p as isize)
            .unwrap_or_else(|| panic!("block {block:?} not on the lexical context"));
        let mut done = false;
        std::iter::from_fn(move || {
            while !done && idx >= 0 {
                match &frames[idx as usize] {
                    Frame::Block(b) => {
                        let body = idx == 0 || matches!(frames[idx as usize - 1], Frame::Function(_));
                        idx -= 1;
                        if body {
                            done = true;
                        }
                        return Some(b);
                    }
                    Frame::Function(_) => {
                        done = true;
                    }
                }
            }
            None
        })
    }

    /// Blocks strictly enclosing `block`, crossing function boundaries.
    pub fn ancestor_blocks(&self, block: BlockId) -> impl Iterator<Item = &BlockFrame> {
        let pos = self
            .position_of_block(block)
            .unwrap_or_else(|| panic!("block {block:?} not on the lexical context"));
        self.frames[..pos].iter().rev().filter_map(|f| match f {
            Frame::Block(b) => Some(b),
            Frame::Function(_) => None,
        })
    }

    /// Innermost function whose body transitively contains the block.
    pub fn defining_function(&self, block: BlockId) -> FnId {
        let pos = self
            .position_of_block(block)
            .unwrap_or_else(|| panic!("block {block:?} not on the lexical context"));
        self.frames[..pos]
            .iter()
            .rev()
            .find_map(|f| match f {
                Frame::Function(f) => Some(f.id),
                Frame::Block(_) => None,
            })
            .expect("block is not inside a function")
    }

    /// Record flags to be merged into the function node when it is popped.
    pub fn set_function_flag(&mut self, id: FnId, flags: FunctionFlags) {
        for frame in self.frames.iter_mut().rev() {
            if let Frame::Function(f) = frame {
                if f.id == id {
                    f.flags |= flags;
                    return;
                }
            }
        }
        panic!("function {id:?} not on the lexical context");
    }

    pub fn set_current_function_flag(&mut self, flags: FunctionFlags) {
        let id = self.current_function().id;
        self.set_function_flag(id, flags);
    }

    /// Record flags to be merged into the block node when it is popped.
    pub fn set_block_flags(&mut self, id: BlockId, flags: BlockFlags) {
        for frame in self.frames.iter_mut().rev() {
            if let Frame::Block(b) = frame {
                if b.id == id {
                    b.flags |= flags;
                    return;
                }
            }
        }
        panic!("block {id:?} not on the lexical context");
    }

    pub fn set_block_needs_scope(&mut self, id: BlockId) {
        self.set_block_flags(id, BlockFlags::NEEDS_SCOPE);
    }

    fn position_of_block(&self, id: BlockId) -> Option<usize> {
        self.frames
            .iter()
            .rposition(|f| matches!(f, Frame::Block(b) if b.id == id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{Block, FunctionNode, IdentNode};
    use crate::token::Token;
    use crate::types::JsType;

    fn block(id: u32) -> Block {
        Block::new(BlockId::from_raw(id), Token::synthetic(), 0, Vec::new())
    }

    fn function(id: u32, body: &Block) -> FunctionNode {
        FunctionNode {
            token: Token::synthetic(),
            finish: 0,
            id: FnId::from_raw(id),
            name: IdentNode::synthetic("f"),
            params: Vec::new(),
            body: body.clone(),
            flags: FunctionFlags::empty(),
            return_type: JsType::Unknown,
            compile_unit: None,
            this_property_count: 0,
        }
    }

    #[test]
    fn blocks_from_stops_at_function_body() {
        let body = block(0);
        let inner = block(1);
        let f = function(0, &body);
        let mut lc = LexicalContext::new();
        lc.push_function(&f);
        lc.push_block(&body);
        lc.push_block(&inner);

        let ids: Vec<_> = lc
            .blocks_from(inner.id)
            .map(|b| b.id.as_u32())
            .collect();
        assert_eq!(ids, vec![1, 0]);
        assert!(!lc.is_function_body());

        lc.pop_block(inner.id);
        assert!(lc.is_function_body());
        lc.pop_block(body.id);
        lc.pop_function(f.id);
        assert!(lc.is_empty());
    }

    #[test]
    #[should_panic(expected = "lexical context imbalance")]
    fn unbalanced_pop_is_fatal() {
        let b0 = block(0);
        let b1 = block(1);
        let mut lc = LexicalContext::new();
        lc.push_block(&b0);
        lc.pop_block(b1.id);
    }

    #[test]
    fn flags_accumulate_on_frames() {
        let body = block(0);
        let f = function(0, &body);
        let mut lc = LexicalContext::new();
        lc.push_function(&f);
        lc.push_block(&body);
        lc.set_block_needs_scope(body.id);
        lc.set_current_function_flag(FunctionFlags::NEEDS_CALLEE);

        let frame = lc.pop_block(body.id);
        assert!(frame.flags.contains(BlockFlags::NEEDS_SCOPE));
        let frame = lc.pop_function(f.id);
        assert!(frame.flags.contains(FunctionFlags::NEEDS_CALLEE));
    }
}
