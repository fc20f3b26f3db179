pub mod block;
pub mod builder;

pub use block::{Block, BlockLabel, BlockList, FunctionBlock, Instruction, InstructionKind};
pub use builder::build;
