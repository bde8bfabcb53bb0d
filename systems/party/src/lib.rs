#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Party membership rules and the bounded wait used by invitations.
//!
//! Invitation and kick checks are pure functions over a [`PartyView`]. Waiting
//! for an invitee's reply is the only asynchronous step in the engine: the
//! reply travels over a [`oneshot`] channel and the wait is capped by the
//! configured invite window.

use std::time::Duration;

use dungeon_core::{
    Command, EngineError, HeroId, PartyView, SessionId, DEFAULT_PARTY_CAPACITY,
};
use tokio::sync::oneshot;

/// Default time an invitee has to answer.
pub const DEFAULT_INVITE_WINDOW: Duration = Duration::from_secs(30);

/// Configuration parameters required to construct the party system.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Config {
    capacity: usize,
    invite_window: Duration,
}

impl Config {
    /// Creates a configuration from the party capacity (owner included) and the reply window.
    #[must_use]
    pub const fn new(capacity: usize, invite_window: Duration) -> Self {
        Self {
            capacity,
            invite_window,
        }
    }

    /// Maximum number of heroes in a party, owner included.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Time an invitee has to answer.
    #[must_use]
    pub const fn invite_window(&self) -> Duration {
        self.invite_window
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(DEFAULT_PARTY_CAPACITY, DEFAULT_INVITE_WINDOW)
    }
}

/// Answer given by an invited hero.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InviteReply {
    /// The hero joins the party.
    Accept,
    /// The hero refuses.
    Decline,
}

/// How an invitation ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InviteOutcome {
    /// The invitee accepted in time.
    Accepted,
    /// The invitee declined or went away.
    Declined,
    /// The invite window elapsed without an answer.
    TimedOut,
}

/// Pure system enforcing party membership rules.
#[derive(Debug)]
pub struct Party {
    config: Config,
}

impl Party {
    /// Creates a new party system using the supplied configuration.
    #[must_use]
    pub const fn new(config: Config) -> Self {
        Self { config }
    }

    /// Configuration the system was built with.
    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// Validates an invitation sent by `actor` to `target`.
    ///
    /// `engaged_elsewhere` names the active session the target already owns or
    /// belongs to, if any.
    pub fn check_invite(
        &self,
        party: PartyView<'_>,
        actor: &HeroId,
        target: &HeroId,
        engaged_elsewhere: Option<&SessionId>,
    ) -> Result<(), EngineError> {
        if !party.is_owner(actor) {
            return Err(EngineError::NotSessionOwner);
        }
        if actor == target {
            return Err(EngineError::SelfInvite);
        }
        if party.contains(target) {
            return Err(EngineError::AlreadyPartyMember(target.clone()));
        }
        if let Some(session) = engaged_elsewhere {
            return Err(EngineError::AlreadyInSession {
                hero: target.clone(),
                session: session.clone(),
            });
        }
        if party.len() >= self.config.capacity {
            return Err(EngineError::PartyFull {
                capacity: self.config.capacity,
            });
        }
        Ok(())
    }

    /// Validates the removal of `target` by `actor`.
    pub fn check_kick(
        &self,
        party: PartyView<'_>,
        actor: &HeroId,
        target: &HeroId,
    ) -> Result<(), EngineError> {
        if !party.is_owner(actor) {
            return Err(EngineError::NotSessionOwner);
        }
        if party.is_owner(target) {
            return Err(EngineError::CannotKickLeader);
        }
        if !party.contains(target) {
            return Err(EngineError::MemberNotFound(target.clone()));
        }
        Ok(())
    }

    /// Emits the command admitting an accepted invitee.
    pub fn admit(&self, session: &SessionId, hero: &HeroId, out: &mut Vec<Command>) {
        out.push(Command::AdmitMember {
            session: session.clone(),
            hero: hero.clone(),
        });
    }

    /// Emits the command removing a kicked member along with their tile occupancy.
    pub fn kick(&self, session: &SessionId, hero: &HeroId, out: &mut Vec<Command>) {
        out.push(Command::ReleaseHero {
            session: session.clone(),
            hero: hero.clone(),
        });
    }
}

/// Waits at most `window` for the invitee's answer.
///
/// A responder dropped without answering counts as a decline.
pub async fn await_reply(reply: oneshot::Receiver<InviteReply>, window: Duration) -> InviteOutcome {
    match tokio::time::timeout(window, reply).await {
        Ok(Ok(InviteReply::Accept)) => InviteOutcome::Accepted,
        Ok(Ok(InviteReply::Decline)) | Ok(Err(_)) => InviteOutcome::Declined,
        Err(_) => InviteOutcome::TimedOut,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn party() -> Party {
        Party::new(Config::default())
    }

    #[test]
    fn invite_rules_follow_precedence() {
        let owner = HeroId::new("owner");
        let guest = HeroId::new("guest");
        let members = vec![owner.clone(), guest.clone()];
        let view = PartyView::new(&owner, &members);
        let newcomer = HeroId::new("newcomer");

        assert_eq!(
            party().check_invite(view, &guest, &newcomer, None),
            Err(EngineError::NotSessionOwner)
        );
        assert_eq!(
            party().check_invite(view, &owner, &owner, None),
            Err(EngineError::SelfInvite)
        );
        assert_eq!(
            party().check_invite(view, &owner, &guest, None),
            Err(EngineError::AlreadyPartyMember(guest.clone()))
        );
        let elsewhere = SessionId::new("other");
        assert!(matches!(
            party().check_invite(view, &owner, &newcomer, Some(&elsewhere)),
            Err(EngineError::AlreadyInSession { .. })
        ));
        assert_eq!(party().check_invite(view, &owner, &newcomer, None), Ok(()));
    }

    #[test]
    fn full_party_rejects_invites() {
        let owner = HeroId::new("owner");
        let members = vec![owner.clone(), HeroId::new("a"), HeroId::new("b")];
        let view = PartyView::new(&owner, &members);

        assert_eq!(
            party().check_invite(view, &owner, &HeroId::new("c"), None),
            Err(EngineError::PartyFull { capacity: 3 })
        );
    }

    #[test]
    fn kick_rules() {
        let owner = HeroId::new("owner");
        let guest = HeroId::new("guest");
        let members = vec![owner.clone(), guest.clone()];
        let view = PartyView::new(&owner, &members);

        assert_eq!(
            party().check_kick(view, &owner, &owner),
            Err(EngineError::CannotKickLeader)
        );
        assert_eq!(
            party().check_kick(view, &guest, &owner),
            Err(EngineError::NotSessionOwner)
        );
        assert_eq!(
            party().check_kick(view, &owner, &HeroId::new("ghost")),
            Err(EngineError::MemberNotFound(HeroId::new("ghost")))
        );
        assert_eq!(party().check_kick(view, &owner, &guest), Ok(()));
    }

    #[tokio::test(start_paused = true)]
    async fn accepted_reply_is_reported() {
        let (responder, reply) = oneshot::channel();
        responder.send(InviteReply::Accept).expect("receiver alive");

        assert_eq!(
            await_reply(reply, DEFAULT_INVITE_WINDOW).await,
            InviteOutcome::Accepted
        );
    }

    #[tokio::test(start_paused = true)]
    async fn dropped_responder_counts_as_decline() {
        let (responder, reply) = oneshot::channel::<InviteReply>();
        drop(responder);

        assert_eq!(
            await_reply(reply, DEFAULT_INVITE_WINDOW).await,
            InviteOutcome::Declined
        );
    }

    #[tokio::test(start_paused = true)]
    async fn silence_times_out_after_the_window() {
        let (_responder, reply) = oneshot::channel::<InviteReply>();
        let started = tokio::time::Instant::now();

        assert_eq!(
            await_reply(reply, Duration::from_secs(30)).await,
            InviteOutcome::TimedOut
        );
        assert!(started.elapsed() >= Duration::from_secs(30));
    }
}
