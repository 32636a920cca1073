pub mod config;
pub mod panels;
pub mod resolver;
pub mod state;

pub use panels::{Panel, PanelOrigin, PanelRegistry};
pub use resolver::{CommandResolver, Directive, Resolution};
pub use state::SessionState;
