/*!
 * Process Module
 * Application processes, their windows, and lifecycle messages
 */

pub mod manager;
pub mod manager_builder;
pub mod traits;
pub mod types;
pub mod window;

pub use manager::ProcessManager;
pub use manager_builder::ProcessManagerBuilder;
pub use traits::{
    Application, ApplicationFactory, Destroyable, InitContext, Initializable, MessageReceiver,
};
pub use types::{
    messages, LifecycleEvent, Message, MessageOptions, ProcessError, ProcessInfo, ProcessOptions,
    ProcessResult, ProcessState,
};
pub use window::{WindowInfo, WindowSpec, WindowState};
