mod allocation;
mod common;
