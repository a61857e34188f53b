// Copyright (c) 2025 Mikko Tanner. All rights reserved.
// Licensed under the MIT License or the Apache License, Version 2.0.
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversions between sections and the std / [ipnet] address types.

use super::{section::Section, structs::IpFam};
use ipnet::IpNet;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

impl From<Ipv4Addr> for Section {
    fn from(addr: Ipv4Addr) -> Self {
        let values: Vec<u32> = addr.octets().iter().map(|&o| o as u32).collect();
        Section::from_single_values(IpFam::V4, &values)
    }
}

impl From<Ipv6Addr> for Section {
    fn from(addr: Ipv6Addr) -> Self {
        let values: Vec<u32> = addr.segments().iter().map(|&s| s as u32).collect();
        Section::from_single_values(IpFam::V6, &values)
    }
}

impl From<IpAddr> for Section {
    fn from(addr: IpAddr) -> Self {
        match addr {
            IpAddr::V4(a) => a.into(),
            IpAddr::V6(a) => a.into(),
        }
    }
}

/// The whole block of the network, prefixed with its prefix length.
impl From<IpNet> for Section {
    fn from(net: IpNet) -> Self {
        Section::from(net.addr()).to_prefix_block_len(net.prefix_len())
    }
}

impl Section {
    /// The single address this section holds, if it is full length and single valued.
    pub fn to_ip_addr(&self) -> Option<IpAddr> {
        if self.is_multiple() {
            return None;
        }
        self.std_addr(self.lower_value())
    }

    /**
    The network this section is, if it is full length and exactly one
    prefix block. A single address becomes a `/32` or `/128` network.
    */
    pub fn to_ipnet(&self) -> Option<IpNet> {
        let prefix: u8 = self.prefix_len_for_single_block()?;
        let addr: IpAddr = self.std_addr(self.lower_value())?;
        IpNet::new(addr, prefix).ok()
    }

    /// The minimal list of networks covering exactly this section.
    pub fn to_ipnets(&self) -> Vec<IpNet> {
        if self.segment_count() != self.family().segment_count() {
            return Vec::new();
        }
        self.span_with_prefix_blocks()
            .iter()
            .filter_map(|block| block.to_ipnet())
            .collect()
    }

    fn std_addr(&self, value: u128) -> Option<IpAddr> {
        if self.segment_count() != self.family().segment_count() {
            return None;
        }
        Some(match self.family() {
            IpFam::V4 => IpAddr::V4(Ipv4Addr::from(value as u32)),
            IpFam::V6 => IpAddr::V6(Ipv6Addr::from(value)),
        })
    }
}

/* -------------------------------------------------------------------------- */
