// Library surface for the binary, headless/integration tests and reuse.
// Keep this lean to avoid coupling to bin-only types in main.rs.
pub mod app_dirs;
pub mod bank;
pub mod config;
pub mod error;
pub mod history;
pub mod logging;
pub mod question;
pub mod runtime;
pub mod session;
pub mod store;
pub mod util;

pub use error::{BankError, SessionError, StoreError};
pub use question::{Choice, ExamType, Explanation, Question};
pub use session::{start_session, Response, Session, Summary};
