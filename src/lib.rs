#![deny(unsafe_code)]

//! miniftpd is a lightweight, async FTP server core.
//!
//! It implements the control-protocol state machine described by RFC 959
//! (base FTP), portions of RFC 2389 (FEAT/OPTS) and RFC 3659
//! (MLST/MLSD, REST/SIZE): command parsing and reply framing, session
//! state, the passive/active data-channel handshake, a rule-based virtual
//! filesystem with per-user permissions, and bandwidth-shaped chunked
//! transfers.
//!
//! It does not parse configuration files, set up logging for the host
//! application, or manage the outer process lifecycle — those are left to
//! the embedder. The concrete filesystem is abstracted behind the
//! [`storage::ObjectStore`] trait; [`storage::StdFilesystem`] is the
//! default, OS-backed implementation.
//!
//! # Quick start
//!
//! ```no_run
//! use miniftpd::{auth::User, config::Config, storage::StdFilesystem, Server};
//!
//! #[tokio::main]
//! async fn main() {
//!     let mut config = Config::default();
//!     config.add_user(User::anonymous("/srv/ftp"));
//!
//!     let server = Server::new(StdFilesystem::new(), config);
//!     server.listen("127.0.0.1:2121").await.unwrap();
//! }
//! ```

pub mod auth;
pub mod config;
pub mod storage;

mod server;

pub use server::error::ServerError;
pub use server::Server;
