mod mocks {
    pub mod gitlab;
}

mod fetch;
mod migrate;
mod mirror;
