// ============================
// crates/backend-lib/src/rooms.rs
// ============================
//! Room registry: maps a journey code to the connections currently joined.
//! Owned exclusively by the connection gateway; fan-out is concurrent so a
//! slow recipient never stalls delivery to the rest of the room.
use convoy_common::ServerEvent;
use dashmap::DashMap;
use metrics::counter;
use std::collections::HashMap;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use uuid::Uuid;

pub type ConnId = Uuid;

#[derive(Default)]
pub struct RoomRegistry {
    rooms: DashMap<String, HashMap<ConnId, mpsc::Sender<ServerEvent>>>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a connection to a room. The gateway enforces the one-room-per-
    /// connection rule by calling [`leave`](Self::leave) on the prior room.
    pub fn join(&self, code: &str, conn: ConnId, tx: mpsc::Sender<ServerEvent>) {
        self.rooms.entry(code.to_string()).or_default().insert(conn, tx);
    }

    /// Remove a connection from a room; empty rooms are dropped.
    pub fn leave(&self, code: &str, conn: ConnId) {
        if let Some(mut members) = self.rooms.get_mut(code) {
            members.remove(&conn);
            if members.is_empty() {
                drop(members);
                self.rooms.remove_if(code, |_, members| members.is_empty());
            }
        }
    }

    /// Number of connections currently joined to a room
    pub fn occupancy(&self, code: &str) -> usize {
        self.rooms.get(code).map_or(0, |members| members.len())
    }

    /// Deliver an event to every connection in the room, including the
    /// sender. Returns the number of successful deliveries.
    pub async fn broadcast(&self, code: &str, event: ServerEvent) -> usize {
        self.fan_out(code, None, event).await
    }

    /// Deliver an event to every connection in the room except one.
    pub async fn broadcast_except(
        &self,
        code: &str,
        except: ConnId,
        event: ServerEvent,
    ) -> usize {
        self.fan_out(code, Some(except), event).await
    }

    async fn fan_out(&self, code: &str, except: Option<ConnId>, event: ServerEvent) -> usize {
        // Clone the senders out of the shard guard so no lock is held
        // across an await.
        let targets: Vec<mpsc::Sender<ServerEvent>> = match self.rooms.get(code) {
            Some(members) => members
                .iter()
                .filter_map(|(conn, tx)| {
                    if Some(*conn) == except {
                        None
                    } else {
                        Some(tx.clone())
                    }
                })
                .collect(),
            None => return 0,
        };

        if targets.is_empty() {
            return 0;
        }

        let mut send_tasks = JoinSet::new();
        for tx in targets {
            let event = event.clone();
            send_tasks.spawn(async move { tx.send(event).await });
        }

        let mut delivered = 0;
        let mut failed = 0;
        while let Some(result) = send_tasks.join_next().await {
            match result {
                Ok(Ok(())) => delivered += 1,
                Ok(Err(_)) | Err(_) => failed += 1,
            }
        }

        counter!(crate::metric_keys::ROOM_BROADCAST).increment(1);
        if failed > 0 {
            counter!(crate::metric_keys::ROOM_SEND_FAILED).increment(failed);
            tracing::warn!(code, failed, "some room members did not receive the event");
        }

        delivered
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn error_event(message: &str) -> ServerEvent {
        ServerEvent::Error {
            message: message.to_string(),
        }
    }

    #[tokio::test]
    async fn test_broadcast_reaches_all_including_sender() {
        let rooms = RoomRegistry::new();
        let (tx_a, mut rx_a) = mpsc::channel(8);
        let (tx_b, mut rx_b) = mpsc::channel(8);
        let sender = Uuid::new_v4();

        rooms.join("XY42QP", sender, tx_a);
        rooms.join("XY42QP", Uuid::new_v4(), tx_b);

        let delivered = rooms.broadcast("XY42QP", error_event("ping")).await;
        assert_eq!(delivered, 2);
        assert!(rx_a.try_recv().is_ok());
        assert!(rx_b.try_recv().is_ok());
    }

    #[tokio::test]
    async fn test_broadcast_except_skips_one() {
        let rooms = RoomRegistry::new();
        let (tx_a, mut rx_a) = mpsc::channel(8);
        let (tx_b, mut rx_b) = mpsc::channel(8);
        let skipped = Uuid::new_v4();

        rooms.join("XY42QP", skipped, tx_a);
        rooms.join("XY42QP", Uuid::new_v4(), tx_b);

        let delivered = rooms
            .broadcast_except("XY42QP", skipped, error_event("ping"))
            .await;
        assert_eq!(delivered, 1);
        assert!(rx_a.try_recv().is_err());
        assert!(rx_b.try_recv().is_ok());
    }

    #[tokio::test]
    async fn test_broadcast_scoped_to_room() {
        let rooms = RoomRegistry::new();
        let (tx_a, mut rx_a) = mpsc::channel(8);
        let (tx_b, mut rx_b) = mpsc::channel(8);

        rooms.join("XY42QP", Uuid::new_v4(), tx_a);
        rooms.join("ZZ99ZZ", Uuid::new_v4(), tx_b);

        rooms.broadcast("XY42QP", error_event("ping")).await;
        assert!(rx_a.try_recv().is_ok());
        assert!(rx_b.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_leave_removes_connection() {
        let rooms = RoomRegistry::new();
        let (tx, mut rx) = mpsc::channel(8);
        let conn = Uuid::new_v4();

        rooms.join("XY42QP", conn, tx);
        assert_eq!(rooms.occupancy("XY42QP"), 1);

        rooms.leave("XY42QP", conn);
        assert_eq!(rooms.occupancy("XY42QP"), 0);

        rooms.broadcast("XY42QP", error_event("ping")).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_closed_receiver_counts_as_failure() {
        let rooms = RoomRegistry::new();
        let (tx_open, mut rx_open) = mpsc::channel(8);
        let (tx_closed, rx_closed) = mpsc::channel(8);
        drop(rx_closed);

        rooms.join("XY42QP", Uuid::new_v4(), tx_open);
        rooms.join("XY42QP", Uuid::new_v4(), tx_closed);

        let delivered = rooms.broadcast("XY42QP", error_event("ping")).await;
        assert_eq!(delivered, 1);
        assert!(rx_open.try_recv().is_ok());
    }
}
