//! Long-running workers: discovery announce/respond, the TCP report
//! service, and the frame scoring loop

pub mod announcer;
pub mod report;
pub mod responder;
pub mod scoring;

pub use announcer::Announcer;
pub use report::ReportServer;
pub use responder::Responder;
