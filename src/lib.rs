// Library root
// -----------
// The binary (`main.rs`) wires these modules into a one-shot CLI and an
// interactive shell.
//
// Module responsibilities:
// - `api`: blocking HTTP access to the Gemini Files and generate-content
//   endpoints, behind the `RemoteFiles` trait.
// - `client`: `FileClient`, which validates input and translates remote
//   failures into the `error` taxonomy.
// - `answer`: the search prompt and the parser for the model's reply.
// - `session`: per-run state (uploaded files, history, API key).
// - `commands`: the dispatcher both shells call.
// - `export`: atomic JSON export of the search history.
// - `ui`: the interactive menu and the output renderers.
pub mod answer;
pub mod api;
pub mod client;
pub mod commands;
pub mod config;
pub mod error;
pub mod export;
pub mod models;
pub mod session;
pub mod ui;
