// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

/// Outcomes observed during one time slice of the window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct Bucket {
    pub(crate) requests: u64,
    pub(crate) failures: u64,
}

impl Bucket {
    pub fn record_request(&mut self) {
        self.requests += 1;
    }

    pub fn record_failure(&mut self) {
        debug_assert!(self.failures < self.requests, "a failure needs a recorded request");
        self.failures += 1;
    }
}
