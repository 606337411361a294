//! Host event bridge tests
//!
//! Registration, delivery order, unsubscription and the dispatch loop.
