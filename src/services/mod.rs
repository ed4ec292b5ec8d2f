pub mod discovery;
pub mod ledger;
pub mod link_capture;
pub mod preflight;
pub mod tracker;

pub use discovery::FileDiscovery;
pub use ledger::Ledger;
pub use link_capture::LinkCapture;
pub use preflight::ServiceProbe;
pub use tracker::FileStateTracker;
