//! In-process transport: every rank is an endpoint of a set of channels.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::sync::mpsc::{Receiver, Sender, channel};
use std::thread;

use crate::dispatcher::{Dispatcher, RunOptions, RunUnit};
use crate::error::{ConfigError, Result, SweepError, TransportError};
use crate::report::RunReport;

use super::{Communicator, Envelope, Message};

/// One rank of an in-process world.
///
/// An endpoint holds no sender to itself, so its inbox closes once every
/// other endpoint has been dropped.
pub struct LocalEndpoint {
    rank: usize,
    peers: Vec<Option<Sender<Envelope>>>,
    inbox: Receiver<Envelope>,
    // Messages received while waiting for a different source or tag
    pending: RefCell<VecDeque<Envelope>>,
}

/// Create the endpoints of a world of `size` ranks, indexed by rank.
#[must_use]
pub fn local_world(size: usize) -> Vec<LocalEndpoint> {
    let (senders, inboxes): (Vec<_>, Vec<_>) = (0..size).map(|_| channel()).unzip();

    inboxes
        .into_iter()
        .enumerate()
        .map(|(rank, inbox)| LocalEndpoint {
            rank,
            peers: senders
                .iter()
                .enumerate()
                .map(|(peer, tx)| (peer != rank).then(|| tx.clone()))
                .collect(),
            inbox,
            pending: RefCell::new(VecDeque::new()),
        })
        .collect()
}

impl LocalEndpoint {
    fn next_envelope(&self) -> std::result::Result<Envelope, TransportError> {
        self.inbox
            .recv()
            .map_err(|_| TransportError::Closed { rank: self.rank })
    }
}

impl Communicator for LocalEndpoint {
    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.peers.len()
    }

    fn send(
        &self,
        dest: usize,
        tag: usize,
        message: Message,
    ) -> std::result::Result<(), TransportError> {
        let peer = self.peers.get(dest).ok_or(TransportError::UnknownRank {
            rank: dest,
            size: self.peers.len(),
        })?;
        let tx = peer
            .as_ref()
            .ok_or(TransportError::SelfSend { rank: self.rank })?;
        tx.send(Envelope {
            source: self.rank,
            tag,
            message,
        })
        .map_err(|_| TransportError::Disconnected { rank: dest })
    }

    fn recv_any(&self) -> std::result::Result<Envelope, TransportError> {
        if let Some(envelope) = self.pending.borrow_mut().pop_front() {
            return Ok(envelope);
        }
        self.next_envelope()
    }

    fn recv(&self, source: usize, tag: usize) -> std::result::Result<Message, TransportError> {
        let buffered = {
            let mut pending = self.pending.borrow_mut();
            pending
                .iter()
                .position(|e| e.source == source && e.tag == tag)
                .and_then(|i| pending.remove(i))
        };
        if let Some(envelope) = buffered {
            return Ok(envelope.message);
        }

        loop {
            let envelope = self.next_envelope()?;
            if envelope.source == source && envelope.tag == tag {
                return Ok(envelope.message);
            }
            self.pending.borrow_mut().push_back(envelope);
        }
    }
}

impl Dispatcher {
    /// Run the distributed protocol in this process, with worker ranks as
    /// threads and this dispatcher as the coordinator.
    ///
    /// `ranks` counts the coordinator, so `ranks - 1` units run at a time.
    pub fn run_ranks<F: RunUnit>(
        &mut self,
        ranks: usize,
        callback: &F,
        options: &RunOptions,
    ) -> Result<RunReport> {
        if ranks < 2 {
            return Err(ConfigError::WorldTooSmall { size: ranks }.into());
        }

        let mut endpoints = local_world(ranks).into_iter();
        let Some(coordinator) = endpoints.next() else {
            return Err(ConfigError::WorldTooSmall { size: ranks }.into());
        };

        thread::scope(|scope| {
            let handles: Vec<_> = endpoints
                .map(|endpoint| {
                    let axes = self.axes.clone();
                    scope.spawn(move || {
                        Dispatcher::from_axes(axes).run_distributed(&endpoint, callback, options)
                    })
                })
                .collect();

            let report = self.run_distributed(&coordinator, callback, options);
            if report.is_err() {
                // Release workers still waiting for a unit
                for rank in 1..ranks {
                    let _ = coordinator.send(rank, rank, Message::Assign(None));
                }
            }
            drop(coordinator);

            let mut worker_error = None;
            for (i, handle) in handles.into_iter().enumerate() {
                let rank = i + 1;
                let outcome = handle
                    .join()
                    .unwrap_or(Err(SweepError::WorkerPanicked { slot: rank }));
                if let Err(e) = outcome {
                    tracing::error!(rank, error = %e, "worker rank failed");
                    worker_error.get_or_insert(e);
                }
            }

            match worker_error {
                Some(e) => Err(e),
                None => report,
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::{Combination, Value};

    fn unit(v: i64) -> Combination {
        Combination::new(vec![vec![Value::Int(v)]])
    }

    #[test]
    fn test_world_ranks_and_size() {
        let world = local_world(3);
        assert_eq!(world.len(), 3);
        for (rank, endpoint) in world.iter().enumerate() {
            assert_eq!(endpoint.rank(), rank);
            assert_eq!(endpoint.size(), 3);
        }
    }

    #[test]
    fn test_recv_buffers_other_sources() {
        let world = local_world(3);
        world[1].send(0, 1, Message::Assign(Some(unit(1)))).unwrap();
        world[2].send(0, 2, Message::Assign(Some(unit(2)))).unwrap();

        assert_eq!(world[0].recv(2, 2).unwrap(), Message::Assign(Some(unit(2))));
        let envelope = world[0].recv_any().unwrap();
        assert_eq!(envelope.source, 1);
        assert_eq!(envelope.tag, 1);
    }

    #[test]
    fn test_recv_matches_tag() {
        let world = local_world(2);
        world[0].send(1, 7, Message::Assign(None)).unwrap();
        world[0].send(1, 1, Message::Assign(Some(unit(5)))).unwrap();

        assert_eq!(world[1].recv(0, 1).unwrap(), Message::Assign(Some(unit(5))));
        assert_eq!(world[1].recv(0, 7).unwrap(), Message::Assign(None));
    }

    #[test]
    fn test_send_errors() {
        let world = local_world(2);
        assert!(matches!(
            world[0].send(0, 0, Message::Assign(None)),
            Err(TransportError::SelfSend { rank: 0 })
        ));
        assert!(matches!(
            world[0].send(5, 0, Message::Assign(None)),
            Err(TransportError::UnknownRank { rank: 5, size: 2 })
        ));
    }

    #[test]
    fn test_inbox_closes_when_peers_drop() {
        let mut world = local_world(2);
        let survivor = world.remove(0);
        drop(world);
        assert!(matches!(
            survivor.recv_any(),
            Err(TransportError::Closed { rank: 0 })
        ));
    }
}
