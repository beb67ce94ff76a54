#[path = "engine/http_loop.rs"]
mod http_loop;
