// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Sliding window of time buckets and the running totals over it.

mod bucket;
mod bucket_window;
mod stats;

pub(crate) use bucket::Bucket;
pub(crate) use bucket_window::BucketWindow;
pub(crate) use stats::AggregateStats;
