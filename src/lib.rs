// Library root
// -----------
// The binary (`main.rs`) wires these modules into an interactive shell over
// a WorkDocs folder tree.
//
// Module responsibilities:
// - `navigator`: the session's position in the folder tree and the cached
//   listing of the current folder. Knows only the traits in `backend`.
// - `backend`: collaborator traits (storage service, byte transport) and
//   the domain types passed across them.
// - `api`: WorkDocs REST client implementing `Backend`.
// - `transport`: signed-URL streaming implementing `Transport`.
// - `shell`: command parsing, dispatch and the input loop.
// - `format`: sizes, content types and column layout.
// - `config` / `error`: environment settings and error kinds.
pub mod api;
pub mod backend;
pub mod config;
pub mod error;
pub mod format;
pub mod navigator;
pub mod shell;
pub mod transport;
