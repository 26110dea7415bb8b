// Copyright (C) 2026  Caprica Software Limited
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

//! Change notification fan-out.
//!
//! Objects that other parts of the application observe (playlists, albums,
//! the info system, the sources sidebar) own a [`Notifier`]. Observers call
//! `subscribe` to get the receiving end of a channel and drain it from their
//! own event loop, the same way the rest of the application consumes events.

use std::sync::{
    Mutex, MutexGuard, PoisonError,
    mpsc::{self, Receiver, Sender},
};

pub(crate) struct Notifier<E> {
    subscribers: Mutex<Vec<Sender<E>>>,
}

impl<E: Clone> Notifier<E> {
    pub(crate) fn new() -> Self {
        Self {
            subscribers: Mutex::new(Vec::new()),
        }
    }

    fn subscribers(&self) -> MutexGuard<'_, Vec<Sender<E>>> {
        self.subscribers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn subscribe(&self) -> Receiver<E> {
        let (tx, rx) = mpsc::channel();
        self.subscribers().push(tx);
        rx
    }

    /// Sends `event` to every live subscriber.
    ///
    /// Subscribers whose receiver has been dropped are pruned.
    pub(crate) fn notify(&self, event: E) {
        self.subscribers()
            .retain(|tx| tx.send(event.clone()).is_ok());
    }
}

impl<E: Clone> Default for Notifier<E> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::Notifier;

    #[test]
    fn every_subscriber_receives_the_event() {
        let notifier = Notifier::new();
        let first = notifier.subscribe();
        let second = notifier.subscribe();

        notifier.notify(7u32);

        assert_eq!(first.try_recv(), Ok(7));
        assert_eq!(second.try_recv(), Ok(7));
    }

    #[test]
    fn dropped_subscribers_are_pruned() {
        let notifier = Notifier::new();
        let kept = notifier.subscribe();
        drop(notifier.subscribe());

        notifier.notify("a");
        notifier.notify("b");

        assert_eq!(notifier.subscribers.lock().unwrap().len(), 1);
        assert_eq!(kept.try_iter().collect::<Vec<_>>(), vec!["a", "b"]);
    }

    #[test]
    fn poisoned_lock_still_delivers() {
        let notifier = Arc::new(Notifier::new());
        let before = notifier.subscribe();

        let poisoned = Arc::clone(&notifier);
        let _ = std::thread::spawn(move || {
            let _guard = poisoned.subscribers.lock().unwrap();
            panic!("poison the subscriber lock");
        })
        .join();

        let after = notifier.subscribe();
        notifier.notify(3u32);

        assert_eq!(before.try_recv(), Ok(3));
        assert_eq!(after.try_recv(), Ok(3));
    }
}
