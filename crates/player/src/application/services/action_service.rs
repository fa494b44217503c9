//! Action service: turns local intents into requests.
//!
//! Every request-level failure ends up as an orange log line instead of an
//! error the presentation layer has to handle. Send errors are also returned
//! so callers can react, but the user already sees them in the log.

use battlemap_shared::{
    CharacterData, ClientRequest, ResponseResult, Role, SelectableCharacter, SessionInfo,
};

use crate::application::context::SessionContext;
use crate::application::dto::PlayerAction;
use crate::coords::RenderPoint;
use crate::error::{ClientError, Result};
use crate::infrastructure::message_translator::translate_roster;
use crate::infrastructure::websocket::ConnectionManager;
use crate::state::{LogColor, StoreEvent};

/// Performs player actions against one connection and one session context.
pub struct ActionService<'a> {
    connection: &'a mut ConnectionManager<SessionContext>,
    ctx: &'a mut SessionContext,
}

impl<'a> ActionService<'a> {
    pub fn new(
        connection: &'a mut ConnectionManager<SessionContext>,
        ctx: &'a mut SessionContext,
    ) -> Self {
        Self { connection, ctx }
    }

    pub fn perform(&mut self, action: PlayerAction) -> Result<()> {
        tracing::debug!(action = action.label(), "Performing player action");
        match action {
            PlayerAction::Select(target) => {
                self.ctx.player.selected_target = target;
                Ok(())
            }
            PlayerAction::Targeted(action) => {
                if action.is_privileged() && !self.ctx.player.is_dm() {
                    tracing::info!(action = action.as_str(), "Refusing DM-only action");
                    self.ctx.log(
                        format!("Only the DM can {}", action.as_str()),
                        LogColor::Orange,
                    );
                    return Err(ClientError::NotPermitted(action.as_str().to_string()));
                }
                self.dispatch_action(ClientRequest::Targeted {
                    action,
                    target: self.selected(),
                })
            }
            PlayerAction::Dash => self.dispatch_action(ClientRequest::Dash),
            PlayerAction::ChangeHealth { life } => {
                self.dispatch_action(ClientRequest::ChangeHealth {
                    target: self.selected(),
                    life,
                })
            }
            PlayerAction::CreateNpcs { amount, allies } => {
                // The batch itself is applied by the createNPCs subscriber.
                self.dispatch_action(ClientRequest::CreateNpcs { amount, allies })
            }
            PlayerAction::EditCharacter(mut stats) => {
                if stats.character.is_none() {
                    stats.character = self.selected();
                }
                self.dispatch_action(ClientRequest::EditCharacter(stats))
            }
            PlayerAction::SwitchWeapon(name) => {
                self.dispatch_action(ClientRequest::SwitchWeapon { name })
            }
            PlayerAction::DropToken {
                character_id,
                origin,
            } => self.drop_token(character_id, origin),
            PlayerAction::Resize(surface) => {
                self.ctx.store.dispatch(StoreEvent::SurfaceResized(surface));
                Ok(())
            }
            PlayerAction::ChooseCharacter { name, password } => self.choose_character(name, password),
            PlayerAction::Login(password) => {
                self.send(ClientRequest::Login { password }, |result, ctx| {
                    if report_failure("login", &result, ctx) {
                        return;
                    }
                    ctx.player.role = Role::Dm;
                    ctx.log("Logged in as DM", LogColor::Green);
                })
            }
            PlayerAction::FetchInfo => self.send(ClientRequest::Info, |result, ctx| {
                if report_failure("info", &result, ctx) {
                    return;
                }
                match result.decode::<SessionInfo>() {
                    Ok(info) => ctx.player.apply_info(info.player),
                    Err(e) => tracing::warn!(error = %e, "Unreadable info response"),
                }
            }),
            PlayerAction::FetchRoster => self.send(ClientRequest::Roster, |result, ctx| {
                if report_failure("getCharacters", &result, ctx) {
                    return;
                }
                if let Some(event) = translate_roster(&result) {
                    ctx.store.dispatch(event);
                }
            }),
            PlayerAction::FetchSelectable => {
                self.send(ClientRequest::SelectableCharacters, |result, ctx| {
                    if report_failure("getSelectableCharacters", &result, ctx) {
                        return;
                    }
                    match result.decode::<Vec<SelectableCharacter>>() {
                        Ok(lobby) => ctx.lobby = lobby,
                        Err(e) => tracing::warn!(error = %e, "Unreadable character listing"),
                    }
                })
            }
        }
    }

    fn selected(&self) -> Option<String> {
        self.ctx.player.selected_target.clone()
    }

    /// Send `request`; a failure response only produces a log line.
    fn dispatch_action(&mut self, request: ClientRequest) -> Result<()> {
        let action = request.action();
        self.send(request, move |result, ctx| {
            report_failure(action, &result, ctx);
        })
    }

    fn send(
        &mut self,
        request: ClientRequest,
        on_response: impl FnOnce(ResponseResult, &mut SessionContext) + Send + 'static,
    ) -> Result<()> {
        let action = request.action();
        self.connection
            .request(&request, on_response)
            .inspect_err(|e| self.ctx.log(format!("{action} failed: {e}"), LogColor::Orange))
    }

    /// Own character moves, the DM places anyone, everyone else is refused
    /// before anything goes on the wire.
    fn drop_token(&mut self, character_id: String, origin: RenderPoint) -> Result<()> {
        let state = self.ctx.store.state();
        let pos = state.viewport.token_center_to_authoritative(origin);

        let request = if self.ctx.player.owns(&character_id) {
            ClientRequest::Move { pos }
        } else if self.ctx.player.is_dm() {
            ClientRequest::Place {
                target: character_id,
                pos,
            }
        } else {
            let name = state.name_of(&character_id);
            tracing::info!(character_id = %character_id, "Refusing to move another player's token");
            self.ctx
                .log(format!("You cannot move {name}"), LogColor::Orange);
            return Err(ClientError::NotPermitted(format!(
                "move character {character_id}"
            )));
        };
        self.dispatch_action(request)
    }

    fn choose_character(&mut self, name: String, password: Option<String>) -> Result<()> {
        let privileged = password.is_some();
        self.send(
            ClientRequest::ChooseCharacter { name, password },
            move |result, ctx| {
                if report_failure("chooseCharacter", &result, ctx) {
                    return;
                }
                if privileged {
                    ctx.player.role = Role::Dm;
                }
                match result.decode::<CharacterData>() {
                    Ok(own) => {
                        ctx.player.character_id = Some(own.id.clone());
                        ctx.log(
                            format!("You are playing {}", display_name(&own)),
                            LogColor::Green,
                        );
                        ctx.store.dispatch(StoreEvent::CharacterUpdate(own));
                    }
                    Err(e) => tracing::warn!(error = %e, "Chosen character could not be read"),
                }
                ctx.queue(PlayerAction::FetchRoster);
            },
        )
    }
}

fn display_name(data: &CharacterData) -> &str {
    if data.name.is_empty() {
        &data.id
    } else {
        &data.name
    }
}

/// Log a failed response. Returns whether the response was a failure.
fn report_failure(action: &str, result: &ResponseResult, ctx: &mut SessionContext) -> bool {
    if result.success {
        return false;
    }
    tracing::info!(action = %action, reason = %result.reason(), "Request rejected");
    ctx.log(
        format!("{action} failed: {}", result.reason()),
        LogColor::Orange,
    );
    true
}
