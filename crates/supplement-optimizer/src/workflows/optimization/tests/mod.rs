mod common;
mod ranking;
mod scoring;
