//! Scripted replays: a JSON array of hero actions applied in order.

use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};

use anyhow::{anyhow, Result};
use dungeon_broadcast::{Channel, ChannelHub, Outbound};
use dungeon_core::{Difficulty, DungeonId, EngineError, GridCoord, HeroId, SessionId, SessionStatus};
use dungeon_service::{DungeonService, InviteOutcome, InviteReply};
use serde::Deserialize;
use tokio::sync::{broadcast, broadcast::error::TryRecvError, Mutex};
use tracing::warn;

use crate::render;

/// Service flavour driven by the binary.
pub(crate) type Service = DungeonService<Arc<ChannelHub>>;

/// Answer an invited hero gives in a script.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum Answer {
    Accept,
    Decline,
    /// Lets the invite window run out.
    Ignore,
}

/// One action of a script. Sessions are referred to by a label chosen in
/// the `create` step, since their identifiers are allocated at runtime.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(tag = "op", rename_all = "kebab-case")]
pub(crate) enum Step {
    Create {
        hero: HeroId,
        session: String,
        dungeon: DungeonId,
        #[serde(default)]
        difficulty: Difficulty,
    },
    Enter {
        hero: HeroId,
        session: String,
    },
    Place {
        hero: HeroId,
        session: String,
    },
    Move {
        hero: HeroId,
        session: String,
        x: u32,
        y: u32,
    },
    Invite {
        hero: HeroId,
        session: String,
        target: HeroId,
        answer: Answer,
    },
    Kick {
        hero: HeroId,
        session: String,
        target: HeroId,
    },
    End {
        hero: HeroId,
        session: String,
        status: SessionStatus,
    },
    Show {
        hero: HeroId,
        session: String,
    },
}

impl Step {
    fn hero(&self) -> &HeroId {
        match self {
            Self::Create { hero, .. }
            | Self::Enter { hero, .. }
            | Self::Place { hero, .. }
            | Self::Move { hero, .. }
            | Self::Invite { hero, .. }
            | Self::Kick { hero, .. }
            | Self::End { hero, .. }
            | Self::Show { hero, .. } => hero,
        }
    }

    fn target(&self) -> Option<&HeroId> {
        match self {
            Self::Invite { target, .. } | Self::Kick { target, .. } => Some(target),
            _ => None,
        }
    }
}

/// Parses a script document.
pub(crate) fn parse(contents: &str) -> Result<Vec<Step>> {
    Ok(serde_json::from_str(contents)?)
}

/// Applies steps against a shared service and prints what every listener receives.
pub(crate) struct Runner<'a> {
    service: &'a Mutex<Service>,
    hub: Arc<ChannelHub>,
    sessions: HashMap<String, SessionId>,
    listening: HashSet<Channel>,
    inboxes: Vec<(Channel, broadcast::Receiver<Outbound>)>,
}

impl<'a> Runner<'a> {
    pub(crate) fn new(service: &'a Mutex<Service>, hub: Arc<ChannelHub>) -> Self {
        Self {
            service,
            hub,
            sessions: HashMap::new(),
            listening: HashSet::new(),
            inboxes: Vec::new(),
        }
    }

    /// Replays every step; engine rejections are reported and the replay goes on.
    pub(crate) async fn run(mut self, steps: Vec<Step>) -> Result<()> {
        for (index, step) in steps.into_iter().enumerate() {
            self.listen(Channel::Hero(step.hero().clone()));
            if let Some(target) = step.target() {
                self.listen(Channel::Hero(target.clone()));
            }

            println!("[{}] {}", index + 1, describe(&step));
            if let Err(error) = self.apply(step).await? {
                println!("    rejected ({:?}): {error}", error.kind());
            }
            self.drain();
        }
        Ok(())
    }

    async fn apply(&mut self, step: Step) -> Result<Result<(), EngineError>> {
        let service = self.service;
        let outcome = match step {
            Step::Create {
                hero,
                session,
                dungeon,
                difficulty,
            } => {
                let created = service
                    .lock()
                    .await
                    .create_session(&hero, &dungeon, difficulty);
                created.map(|view| {
                    self.listen(Channel::Session(view.session.id.clone()));
                    let _ = self.sessions.insert(session, view.session.id.clone());
                    print!("{}", render::view(&view));
                })
            }
            Step::Enter { hero, session } => {
                let id = self.session(&session)?;
                self.listen(Channel::Session(id.clone()));
                let entered = service.lock().await.enter_session(&id, &hero);
                entered.map(|view| print!("{}", render::view(&view)))
            }
            Step::Place { hero, session } => {
                let id = self.session(&session)?;
                let placed = service.lock().await.place_hero(&id, &hero);
                placed.map(|tile| println!("    {hero} stands on {}", tile.coord))
            }
            Step::Move {
                hero,
                session,
                x,
                y,
            } => {
                let id = self.session(&session)?;
                let moved = service
                    .lock()
                    .await
                    .move_hero(&id, &hero, GridCoord::new(x, y));
                moved.map(|outcome| {
                    println!(
                        "    {hero} moved {} -> {}",
                        outcome.origin.coord, outcome.destination.coord
                    );
                })
            }
            Step::Invite {
                hero,
                session,
                target,
                answer,
            } => {
                let id = self.session(&session)?;
                invite(service, &id, &hero, &target, answer)
                    .await
                    .map(|outcome| println!("    invite {outcome:?}"))
            }
            Step::Kick {
                hero,
                session,
                target,
            } => {
                let id = self.session(&session)?;
                let kicked = service.lock().await.kick(&id, &hero, &target);
                kicked.map(|()| println!("    {target} left the party"))
            }
            Step::End {
                hero,
                session,
                status,
            } => {
                let id = self.session(&session)?;
                let ended = service.lock().await.end_session(&id, &hero, status);
                ended.map(|plan| println!("    {plan:?}"))
            }
            Step::Show { hero, session } => {
                let id = self.session(&session)?;
                let view = service.lock().await.session_view(&id, &hero);
                view.map(|view| print!("{}", render::view(&view)))
            }
        };
        Ok(outcome)
    }

    fn session(&self, label: &str) -> Result<SessionId> {
        self.sessions
            .get(label)
            .cloned()
            .ok_or_else(|| anyhow!("script refers to session `{label}` before creating it"))
    }

    fn listen(&mut self, channel: Channel) {
        if self.listening.insert(channel.clone()) {
            let receiver = self.hub.subscribe(channel.clone());
            self.inboxes.push((channel, receiver));
        }
    }

    fn drain(&mut self) {
        for (channel, inbox) in &mut self.inboxes {
            loop {
                match inbox.try_recv() {
                    Ok(message) => match serde_json::to_string(&message) {
                        Ok(json) => println!("    {channel} <- {json}"),
                        Err(error) => warn!(%channel, %error, "unprintable message"),
                    },
                    Err(TryRecvError::Lagged(skipped)) => {
                        warn!(%channel, skipped, "listener fell behind");
                    }
                    Err(TryRecvError::Empty | TryRecvError::Closed) => break,
                }
            }
        }
    }
}

/// Opens the invite, answers it on the invitee's behalf and settles it.
async fn invite(
    service: &Mutex<Service>,
    session: &SessionId,
    owner: &HeroId,
    target: &HeroId,
    answer: Answer,
) -> Result<InviteOutcome, EngineError> {
    let ticket = {
        let mut guard = service.lock().await;
        let ticket = guard.open_invite(session, owner, target)?;
        let reply = match answer {
            Answer::Accept => Some(InviteReply::Accept),
            Answer::Decline => Some(InviteReply::Decline),
            Answer::Ignore => None,
        };
        if let Some(reply) = reply {
            guard.respond_invite(target, reply)?;
        }
        ticket
    };
    let settled = ticket.wait().await;
    service.lock().await.conclude_invite(settled)
}

fn describe(step: &Step) -> String {
    match step {
        Step::Create {
            hero,
            session,
            dungeon,
            difficulty,
        } => format!("{hero} opens `{session}` in {dungeon} ({difficulty:?})"),
        Step::Enter { hero, session } => format!("{hero} enters `{session}`"),
        Step::Place { hero, session } => format!("{hero} takes a seat in `{session}`"),
        Step::Move { hero, x, y, .. } => format!("{hero} steps to ({x}, {y})"),
        Step::Invite {
            hero,
            target,
            answer,
            ..
        } => format!("{hero} invites {target}, who will {answer:?}"),
        Step::Kick { hero, target, .. } => format!("{hero} kicks {target}"),
        Step::End { hero, status, .. } => format!("{hero} ends the session as {status}"),
        Step::Show { hero, session } => format!("{hero} looks at `{session}`"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_tagged_steps() {
        let steps = parse(
            r#"[
                {"op": "create", "hero": "alice", "session": "main", "dungeon": "test"},
                {"op": "move", "hero": "alice", "session": "main", "x": 2, "y": 1},
                {"op": "invite", "hero": "alice", "session": "main", "target": "bob", "answer": "accept"},
                {"op": "end", "hero": "alice", "session": "main", "status": "completed"}
            ]"#,
        )
        .expect("valid script");

        assert_eq!(steps.len(), 4);
        assert_eq!(
            steps[0],
            Step::Create {
                hero: HeroId::new("alice"),
                session: "main".to_owned(),
                dungeon: DungeonId::new("test"),
                difficulty: Difficulty::Easy,
            }
        );
        assert_eq!(steps[2].target(), Some(&HeroId::new("bob")));
        assert!(matches!(
            steps[3],
            Step::End {
                status: SessionStatus::Completed,
                ..
            }
        ));
    }

    #[test]
    fn rejects_unknown_operations() {
        assert!(parse(r#"[{"op": "teleport", "hero": "alice"}]"#).is_err());
    }
}
