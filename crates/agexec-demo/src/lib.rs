pub mod line_format;
pub mod mocks;
pub mod react_loop;

pub use line_format::LineFormat;
pub use mocks::{DemoTermination, DemoToolChain, DemoValidator, ScriptedModel};
pub use react_loop::ReactAgentLoop;
