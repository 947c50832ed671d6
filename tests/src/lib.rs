//! End-to-end tests for ServiceX transformations.
//!
//! Tests submit a query, wait for the transformation to finish and check the rows it
//! produced. Scenarios run against mocked ServiceX and object store services by default;
//! tests against a live deployment are ignored unless run with `cargo test -- --ignored`.


#[cfg(test)]
mod tests;
