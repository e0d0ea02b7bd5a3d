//! Call frames: one activation record per function invocation.

use std::rc::Rc;

use crate::code::Instructions;
use crate::value::CompiledFunction;

/// An activation record on the VM's frame stack.
///
/// `ip` starts at −1 so the dispatch loop's pre-increment lands on byte 0.
/// `base_pointer` marks where this frame's local slots begin on the shared
/// operand stack: local *i* lives at `stack[base_pointer + i]`.
#[derive(Debug)]
pub struct Frame {
    function: Rc<CompiledFunction>,
    pub ip: isize,
    pub base_pointer: usize,
}

impl Frame {
    pub fn new(function: Rc<CompiledFunction>, base_pointer: usize) -> Frame {
        Frame {
            function,
            ip: -1,
            base_pointer,
        }
    }

    pub fn instructions(&self) -> &Instructions {
        &self.function.instructions
    }
}
