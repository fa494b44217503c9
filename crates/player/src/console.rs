//! Line-oriented console presentation.
//!
//! Parses commands typed on stdin into session intents and renders new log
//! entries and link status as plain text.

use anyhow::{anyhow, bail, Context};

use battlemap_shared::{CharacterStats, TargetedAction};

use crate::application::PlayerAction;
use crate::coords::Size;
use crate::infrastructure::messaging::LinkStatus;
use crate::session::Intent;
use crate::state::GameState;

pub const HELP: &str = "\
commands:
  select <id>|none        choose the target of targeted actions
  attack | spell | pass   act on the selected target
  start | continue | reset | kill | stun
  dash
  hp <delta>              change the selected character's hit points
  npcs <amount> [ally]    spawn NPCs
  edit <hp> <max> <dice> <damage> <modifier> <armor>
  weapon <name>           switch weapon
  drop <id> <x> <y>       drop a token at render coordinates
  resize <width> <height> report a new map surface size
  choose <name> [password]
  login <password>
  info | roster | lobby   refresh from the server
  reconnect | disconnect
  status | help | quit";

/// A parsed console line.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Intent(Intent),
    Status,
    Help,
    Quit,
}

impl From<PlayerAction> for Command {
    fn from(action: PlayerAction) -> Self {
        Command::Intent(Intent::Act(action))
    }
}

/// Parse one line. Blank lines yield `None`.
pub fn parse_command(line: &str) -> anyhow::Result<Option<Command>> {
    let mut words = line.split_whitespace();
    let Some(verb) = words.next() else {
        return Ok(None);
    };
    let args: Vec<&str> = words.collect();

    match verb.to_ascii_lowercase().as_str() {
        "select" => {
            let id = arg(&args, 0, "character id")?;
            let target = (!id.eq_ignore_ascii_case("none")).then(|| id.to_string());
            Ok(Some(PlayerAction::Select(target).into()))
        }
        "attack" => targeted(TargetedAction::Attack),
        "spell" => targeted(TargetedAction::Spell),
        "pass" => targeted(TargetedAction::Pass),
        "start" => targeted(TargetedAction::Start),
        "continue" => targeted(TargetedAction::Continue),
        "reset" => targeted(TargetedAction::Reset),
        "kill" => targeted(TargetedAction::Kill),
        "stun" => targeted(TargetedAction::Stun),
        "dash" => Ok(Some(PlayerAction::Dash.into())),
        "hp" => {
            let life = number(&args, 0, "hit point delta")?;
            Ok(Some(PlayerAction::ChangeHealth { life }.into()))
        }
        "npcs" => {
            let amount = number(&args, 0, "amount")?;
            let allies = match args.get(1) {
                None => false,
                Some(flag) if flag.eq_ignore_ascii_case("ally") => true,
                Some(other) => bail!("expected 'ally', got '{other}'"),
            };
            Ok(Some(PlayerAction::CreateNpcs { amount, allies }.into()))
        }
        "edit" => {
            let stats = CharacterStats {
                character: None,
                curr_hp: number(&args, 0, "hp")?,
                max_hp: number(&args, 1, "max hp")?,
                dice: number(&args, 2, "dice")?,
                damage: number(&args, 3, "damage")?,
                modifier: number(&args, 4, "modifier")?,
                armor: number(&args, 5, "armor")?,
            };
            Ok(Some(PlayerAction::EditCharacter(stats).into()))
        }
        "weapon" => {
            if args.is_empty() {
                bail!("missing weapon name");
            }
            Ok(Some(PlayerAction::SwitchWeapon(args.join(" ")).into()))
        }
        "drop" => {
            let id = arg(&args, 0, "character id")?;
            let x = number(&args, 1, "x")?;
            let y = number(&args, 2, "y")?;
            Ok(Some(PlayerAction::drop_token(id, x, y).into()))
        }
        "resize" => {
            let width = number(&args, 0, "width")?;
            let height = number(&args, 1, "height")?;
            Ok(Some(PlayerAction::Resize(Size::new(width, height)).into()))
        }
        "choose" => {
            let name = arg(&args, 0, "character name")?.to_string();
            let password = args.get(1).map(|p| p.to_string());
            Ok(Some(PlayerAction::ChooseCharacter { name, password }.into()))
        }
        "login" => {
            let password = arg(&args, 0, "password")?.to_string();
            Ok(Some(PlayerAction::Login(password).into()))
        }
        "info" => Ok(Some(PlayerAction::FetchInfo.into())),
        "roster" => Ok(Some(PlayerAction::FetchRoster.into())),
        "lobby" => Ok(Some(PlayerAction::FetchSelectable.into())),
        "reconnect" => Ok(Some(Command::Intent(Intent::Reconnect))),
        "disconnect" => Ok(Some(Command::Intent(Intent::Disconnect))),
        "status" => Ok(Some(Command::Status)),
        "help" | "?" => Ok(Some(Command::Help)),
        "quit" | "exit" => Ok(Some(Command::Quit)),
        other => bail!("unknown command '{other}' (try 'help')"),
    }
}

fn targeted(action: TargetedAction) -> anyhow::Result<Option<Command>> {
    Ok(Some(PlayerAction::Targeted(action).into()))
}

fn arg<'a>(args: &[&'a str], index: usize, what: &str) -> anyhow::Result<&'a str> {
    args.get(index)
        .copied()
        .ok_or_else(|| anyhow!("missing {what}"))
}

fn number<T>(args: &[&str], index: usize, what: &str) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw = arg(args, index, what)?;
    raw.parse()
        .with_context(|| format!("invalid {what} '{raw}'"))
}

/// Log lines appended since `seen` entries had been printed, oldest first.
///
/// Entries the cap dropped before they could be printed are skipped.
pub fn new_log_lines(state: &GameState, seen: u64) -> Vec<String> {
    let fresh = state.log_total.saturating_sub(seen);
    let fresh = usize::try_from(fresh).unwrap_or(usize::MAX).min(state.log.len());
    state
        .log
        .iter()
        .skip(state.log.len() - fresh)
        .map(|entry| match entry.timestamp {
            Some(at) => format!(
                "[{}] {} {}",
                entry.color.as_str(),
                at.format("%H:%M:%S"),
                entry.message
            ),
            None => format!("[{}] {}", entry.color.as_str(), entry.message),
        })
        .collect()
}

pub fn describe_status(status: &LinkStatus) -> String {
    match &status.last_error {
        Some(reason) => format!("{} (last error: {reason})", status.state.as_str()),
        None => status.state.as_str().to_string(),
    }
}

/// One-line summary of the round and the roster.
pub fn describe_state(state: &GameState) -> String {
    let active = state
        .active_character()
        .map(|c| c.display_name().to_string())
        .unwrap_or_else(|| "-".into());
    let roster: Vec<String> = state
        .roster()
        .into_iter()
        .map(|c| format!("{} {}/{}", c.display_name(), c.hp.current, c.hp.max))
        .collect();
    format!(
        "round {} ({:?}), active: {active}, characters: [{}]",
        state.round,
        state.phase,
        roster.join(", ")
    )
}
