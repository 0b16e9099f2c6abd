use std::convert::Infallible;

use chrono::{DateTime, Utc};
use serde::Serialize;
use warp::{Filter, Rejection, Reply};

use crate::server::Server;

#[derive(Serialize)]
struct Health {
    status: &'static str,
    timestamp: DateTime<Utc>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RoomOverview {
    room_id: String,
    participant_count: usize,
    participants: Vec<RoomOccupant>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RoomOccupant {
    name: String,
    email: String,
    joined_at: DateTime<Utc>,
}

pub fn routes(server: Server) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    let ws = {
        let server = server.clone();
        warp::path("ws").and(warp::ws()).map(move |ws: warp::ws::Ws| {
            let server = server.clone();
            ws.on_upgrade(move |socket| async move {
                server.handle_connection(socket).await;
            })
        })
    };

    let health = warp::path("health")
        .and(warp::get())
        .map(|| {
            warp::reply::json(&Health {
                status: "OK",
                timestamp: Utc::now(),
            })
        });

    // Read-only introspection; an unknown room reports zero participants.
    let room = warp::path!("room" / String)
        .and(warp::get())
        .and_then(move |room_id: String| {
            let server = server.clone();
            async move {
                let participants = server.room_participants(&room_id).await;
                let overview = RoomOverview {
                    participant_count: participants.len(),
                    participants: participants
                        .into_iter()
                        .map(|p| RoomOccupant {
                            name: p.name,
                            email: p.email,
                            joined_at: p.joined_at,
                        })
                        .collect(),
                    room_id,
                };
                Ok::<_, Infallible>(warp::reply::json(&overview))
            }
        });

    ws.or(health)
        .or(room)
        .with(warp::cors().allow_any_origin())
}
