// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Output routing strategies.
//!
//! A step copy sends each row either to the copy owning the row's partition
//! ([`Partitioner`]) or to one or more equivalent outputs chosen by a
//! [`RowDistributor`]. The two are never combined for one step.

mod distributor;
mod partitioner;

pub use distributor::{
    BroadcastDistributor, DistributionDefaults, DistributorFactory, DistributorRegistry,
    RoundRobinDistributor, RowDistributor, BROADCAST, ROUND_ROBIN,
};
pub use partitioner::{ModPartitioner, Partitioner};
