// Tests with the prefix 'mock_test_' drive a whole heap over `MockVM`. They are only compiled
// with the feature 'mock_test', which also enables `crate::util::test_util::mock_vm`.

#[cfg(feature = "mock_test")]
mod mock_tests;
