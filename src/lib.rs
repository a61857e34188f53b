// Copyright (c) 2026 Mikko Tanner. All rights reserved.
// Licensed under the MIT License or the Apache License, Version 2.0.
// SPDX-License-Identifier: MIT OR Apache-2.0

/*!
IP address sections as ranges: every segment holds an inclusive value range
and the section may carry a prefix length. Subnets, CIDR blocks and
arbitrary per-segment ranges are all handled without enumerating the
addresses they contain.
*/

mod iptools;

pub use iptools::*;
