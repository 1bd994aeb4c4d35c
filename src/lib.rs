#![deny(missing_docs)]
#![deny(missing_debug_implementations)]

//! # tether
//!
//! tether is a small, **blocking** HTTP/1.1 client.
//!
//! A request is built with one of the verb functions ([`get`], [`post`],
//! [`put`], or [`make_request`] for the full verb set), decorated with
//! headers, a body, and optional progress callbacks, and then sent. [`send`]
//! blocks the calling thread until the complete response has arrived;
//! [`send_async`] runs the same exchange on a worker thread and returns a
//! handle that can be polled or awaited by joining.
//!
//! ```no_run
//! use tether::ParsedHeaders;
//!
//! fn main() -> tether::Result<()> {
//!     let response = tether::get("https://example.com/")
//!         .add_header(tether::Header::new("Accept", "text/html"))
//!         .send()?;
//!
//!     println!("{} after {:?}", response.get_status_code(), response.get_total_time());
//!     println!("{}", response.get_body_string());
//!     Ok(())
//! }
//! ```
//!
//! ## Progress and cancellation
//!
//! Four optional callbacks observe the exchange while it happens: raw
//! packets, the parsed header block, body progress, and the finished
//! response. Each progress event exposes [`stop()`][ResponseProgressRaw::stop];
//! setting it ends the exchange cleanly at the next packet boundary and
//! `send` returns whatever had been parsed so far.
//!
//! ```no_run
//! # fn main() -> tether::Result<()> {
//! let response = tether::get("http://example.com/big-file")
//!     .set_body_progress_callback(|progress| {
//!         if progress.body_so_far.len() > 1024 * 1024 {
//!             progress.stop();
//!         }
//!     })
//!     .send()?;
//! # Ok(())
//! # }
//! ```
//!
//! [`send`]: Request::send
//! [`send_async`]: Request::send_async

pub use crate::error::{Error, Result};
pub use crate::header::{find_header, parse_header_block, parse_header_line, Header};
pub use crate::method::{InvalidMethod, Method};
pub use crate::progress::{ResponseProgressBody, ResponseProgressHeaders, ResponseProgressRaw};
pub use crate::request::{get, make_request, post, put, Request, ResponseFuture};
pub use crate::response::{ParsedHeaders, ParsedResponse, Response};
pub use crate::status::{parse_status_line, StatusLine};
pub use crate::url::{split_authority, split_url, uri_encode, Protocol, UrlComponents};

mod error;
mod header;
mod method;
#[cfg(test)]
mod mock;
pub mod net;
mod progress;
mod proto;
mod request;
mod response;
mod status;
mod url;
