use std::net::IpAddr;
use std::path::PathBuf;

const PORT: &str = "PORT";

pub fn get_port() -> Option<u16> {
    std::env::var(PORT).ok().and_then(|res| res.parse().ok())
}

const HUB_ADDR: &str = "HUB_ADDR";

pub fn get_addr() -> Option<IpAddr> {
    std::env::var(HUB_ADDR).ok().and_then(|res| res.parse().ok())
}

const BUFFER_FILE: &str = "BUFFER_FILE";

pub fn get_buffer_path() -> Option<PathBuf> {
    non_empty_var(BUFFER_FILE).map(PathBuf::from)
}

const DATABASE_PATH: &str = "DATABASE_PATH";

pub fn get_database_path() -> Option<PathBuf> {
    non_empty_var(DATABASE_PATH).map(PathBuf::from)
}

fn non_empty_var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.trim().is_empty())
}
