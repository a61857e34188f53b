// Copyright (c) 2026 Mikko Tanner. All rights reserved.
// Licensed under the MIT License or the Apache License, Version 2.0.
// SPDX-License-Identifier: MIT OR Apache-2.0

use parking_lot::RwLock;
use std::fmt;

/**
Publish-once cell for values derived from immutable data.

Readers only take the read lock. The initializer runs without holding any
lock, so concurrent callers may compute the same value redundantly, but the
first value published is the one every caller observes from then on.
*/
pub(crate) struct Memo<T> {
    inner: RwLock<Option<T>>,
}

impl<T: Clone> Memo<T> {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(None),
        }
    }

    pub fn get_or_init<F>(&self, init: F) -> T
    where
        F: FnOnce() -> T,
    {
        if let Some(v) = self.inner.read().as_ref() {
            return v.clone();
        }
        let computed: T = init();
        self.inner.write().get_or_insert(computed).clone()
    }

    pub fn get(&self) -> Option<T> {
        self.inner.read().clone()
    }
}

impl<T: Clone> Default for Memo<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone> Clone for Memo<T> {
    fn clone(&self) -> Self {
        Self {
            inner: RwLock::new(self.get()),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Memo<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.inner.read().as_ref() {
            Some(v) => write!(f, "Memo({v:?})"),
            None => write!(f, "Memo(<pending>)"),
        }
    }
}

/* -------------------------------------------------------------------------- */
