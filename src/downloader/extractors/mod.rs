// Extractor layer - the yt-dlp collaborator and the probe chain around it
//
// `MediaExtractor` is the seam: `YtDlpCli` drives the real binary, tests
// plug in scripted fakes. `ProbeEngine` walks a `ProbeChain` of option
// profiles and turns the last failure into user guidance.

pub mod cli;
pub mod diagnostics;
pub mod probe;
pub mod traits;

pub use cli::YtDlpCli;
pub use diagnostics::{diagnose, Diagnosis, ErrorKind};
pub use probe::ProbeEngine;
pub use traits::{CookieSource, ExtractorOptions, MediaExtractor, ProbeChain, ProbeProfile};
