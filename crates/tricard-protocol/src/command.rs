//! Inbound commands.

use std::str::FromStr;

use crate::{ProtocolError, RoomName, Username};

/// Every command a client may send.
///
/// Parsing happens once, at the connection boundary. Handlers only ever
/// see this enum, never the raw frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `LOGIN;<user>;<password>`: first frame of every connection.
    Login { username: Username, password: String },
    /// `CREATE`: open a new room and take its host seat.
    Create,
    /// `JOIN;<room>`
    Join(RoomName),
    /// `READY;<room>[;true|false]`
    Ready { room: RoomName, ready: bool },
    /// `START;<room>`: host only.
    Start(RoomName),
    /// `DRAW;<room>`: current turn holder only.
    Draw(RoomName),
    /// `KICK_PLAYER;<user>`: host only, lobby state only.
    KickPlayer(Username),
    /// `LEAVE_ROOM[;<room>]`: the room field is informational.
    LeaveRoom(Option<RoomName>),
    /// `GET_ROOM_UPDATE;<room>`: resend roster and ready snapshot.
    GetRoomUpdate(RoomName),
    /// `GET_PLAYER_LIST`
    GetPlayerList,
    /// `GET_ROOMS`
    GetRooms,
    /// `GET_HISTORY`: summaries of the most recent matches.
    GetHistory,
    /// `GET_HISTORY_DETAIL`: recent matches with every player's hand.
    GetHistoryDetail,
    /// `GET_MATCH_DETAIL;<id>`. `None` when the id is not a number; the
    /// server answers that with an error payload instead of ignoring it.
    GetMatchDetail(Option<u64>),
    /// `INVITE;<user>`: ask a free player to join the sender's room.
    Invite(Username),
    /// `EXIT`: close the connection.
    Exit,
}

impl Command {
    /// The wire keyword, for logging.
    pub fn keyword(&self) -> &'static str {
        match self {
            Self::Login { .. } => "LOGIN",
            Self::Create => "CREATE",
            Self::Join(_) => "JOIN",
            Self::Ready { .. } => "READY",
            Self::Start(_) => "START",
            Self::Draw(_) => "DRAW",
            Self::KickPlayer(_) => "KICK_PLAYER",
            Self::LeaveRoom(_) => "LEAVE_ROOM",
            Self::GetRoomUpdate(_) => "GET_ROOM_UPDATE",
            Self::GetPlayerList => "GET_PLAYER_LIST",
            Self::GetRooms => "GET_ROOMS",
            Self::GetHistory => "GET_HISTORY",
            Self::GetHistoryDetail => "GET_HISTORY_DETAIL",
            Self::GetMatchDetail(_) => "GET_MATCH_DETAIL",
            Self::Invite(_) => "INVITE",
            Self::Exit => "EXIT",
        }
    }
}

/// Positional field reader over a `;`-split frame.
struct Fields<'a> {
    command: &'static str,
    parts: std::str::Split<'a, char>,
}

impl<'a> Fields<'a> {
    fn optional(&mut self) -> Option<&'a str> {
        self.parts.next().map(str::trim).filter(|s| !s.is_empty())
    }

    fn required(&mut self, field: &'static str) -> Result<&'a str, ProtocolError> {
        self.optional().ok_or(ProtocolError::MissingField {
            command: self.command,
            field,
        })
    }

    fn room(&mut self) -> Result<RoomName, ProtocolError> {
        RoomName::parse(self.required("room")?)
    }

    fn username(&mut self) -> Result<Username, ProtocolError> {
        Username::parse(self.required("username")?)
    }
}

impl FromStr for Command {
    type Err = ProtocolError;

    fn from_str(frame: &str) -> Result<Self, Self::Err> {
        let frame = frame.trim();
        if frame.is_empty() {
            return Err(ProtocolError::Empty);
        }

        let mut parts = frame.split(';');
        let keyword = parts.next().unwrap_or_default().trim().to_ascii_uppercase();
        let fields = |command: &'static str| Fields { command, parts: parts.clone() };

        let command = match keyword.as_str() {
            "LOGIN" => {
                let mut f = fields("LOGIN");
                let username = f.username()?;
                let password = f.required("password")?.to_string();
                Self::Login { username, password }
            }
            "CREATE" => Self::Create,
            "JOIN" => Self::Join(fields("JOIN").room()?),
            "READY" => {
                let mut f = fields("READY");
                let room = f.room()?;
                let ready = match f.optional() {
                    None => true,
                    Some(flag) if flag.eq_ignore_ascii_case("true") => true,
                    Some(flag) if flag.eq_ignore_ascii_case("false") => false,
                    Some(other) => {
                        return Err(ProtocolError::InvalidArgument(format!(
                            "ready flag must be true or false, got {other:?}"
                        )));
                    }
                };
                Self::Ready { room, ready }
            }
            "START" => Self::Start(fields("START").room()?),
            "DRAW" => Self::Draw(fields("DRAW").room()?),
            "KICK_PLAYER" => Self::KickPlayer(fields("KICK_PLAYER").username()?),
            "LEAVE_ROOM" => {
                let room = fields("LEAVE_ROOM")
                    .optional()
                    .map(RoomName::parse)
                    .transpose()?;
                Self::LeaveRoom(room)
            }
            "GET_ROOM_UPDATE" => Self::GetRoomUpdate(fields("GET_ROOM_UPDATE").room()?),
            "GET_PLAYER_LIST" => Self::GetPlayerList,
            "GET_ROOMS" => Self::GetRooms,
            "GET_HISTORY" => Self::GetHistory,
            "GET_HISTORY_DETAIL" => Self::GetHistoryDetail,
            "GET_MATCH_DETAIL" => {
                let id = fields("GET_MATCH_DETAIL").required("match id")?;
                Self::GetMatchDetail(id.parse().ok())
            }
            "INVITE" => Self::Invite(fields("INVITE").username()?),
            "EXIT" => Self::Exit,
            _ => return Err(ProtocolError::UnknownCommand(keyword)),
        };
        Ok(command)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn room(name: &str) -> RoomName {
        RoomName::parse(name).unwrap()
    }

    fn user(name: &str) -> Username {
        Username::parse(name).unwrap()
    }

    #[test]
    fn test_parse_room_commands() {
        assert_eq!("CREATE".parse(), Ok(Command::Create));
        assert_eq!("JOIN;Room_1".parse(), Ok(Command::Join(room("Room_1"))));
        assert_eq!("START;Room_2".parse(), Ok(Command::Start(room("Room_2"))));
        assert_eq!("DRAW;Room_2".parse(), Ok(Command::Draw(room("Room_2"))));
        assert_eq!(
            "GET_ROOM_UPDATE;Room_9".parse(),
            Ok(Command::GetRoomUpdate(room("Room_9")))
        );
    }

    #[test]
    fn test_parse_ready_defaults_to_true() {
        assert_eq!(
            "READY;Room_1".parse(),
            Ok(Command::Ready { room: room("Room_1"), ready: true })
        );
        assert_eq!(
            "READY;Room_1;false".parse(),
            Ok(Command::Ready { room: room("Room_1"), ready: false })
        );
        assert!(matches!(
            "READY;Room_1;maybe".parse::<Command>(),
            Err(ProtocolError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_parse_login_and_kick() {
        assert_eq!(
            "LOGIN;alice;secret".parse(),
            Ok(Command::Login { username: user("alice"), password: "secret".into() })
        );
        assert_eq!("KICK_PLAYER;bob".parse(), Ok(Command::KickPlayer(user("bob"))));
    }

    #[test]
    fn test_parse_leave_room_field_is_optional() {
        assert_eq!("LEAVE_ROOM".parse(), Ok(Command::LeaveRoom(None)));
        assert_eq!("LEAVE_ROOM;".parse(), Ok(Command::LeaveRoom(None)));
        assert_eq!(
            "LEAVE_ROOM;Room_4".parse(),
            Ok(Command::LeaveRoom(Some(room("Room_4"))))
        );
    }

    #[test]
    fn test_parse_is_case_insensitive_and_trims() {
        assert_eq!("  get_rooms \n".parse(), Ok(Command::GetRooms));
        assert_eq!("exit".parse(), Ok(Command::Exit));
        assert_eq!("Get_Player_List".parse(), Ok(Command::GetPlayerList));
    }

    #[test]
    fn test_parse_rejects_missing_fields() {
        assert_eq!(
            "JOIN".parse::<Command>(),
            Err(ProtocolError::MissingField { command: "JOIN", field: "room" })
        );
        assert_eq!(
            "LOGIN;alice".parse::<Command>(),
            Err(ProtocolError::MissingField { command: "LOGIN", field: "password" })
        );
        assert_eq!(
            "KICK_PLAYER;".parse::<Command>(),
            Err(ProtocolError::MissingField { command: "KICK_PLAYER", field: "username" })
        );
    }

    #[test]
    fn test_parse_rejects_unknown_and_empty() {
        assert_eq!("".parse::<Command>(), Err(ProtocolError::Empty));
        assert_eq!(
            "FLY;Room_1".parse::<Command>(),
            Err(ProtocolError::UnknownCommand("FLY".into()))
        );
        assert!(matches!(
            "JOIN;bad|room".parse::<Command>(),
            Err(ProtocolError::InvalidName(_))
        ));
    }

    #[test]
    fn test_parse_history_and_invite() {
        assert_eq!("GET_HISTORY".parse(), Ok(Command::GetHistory));
        assert_eq!("get_history_detail".parse(), Ok(Command::GetHistoryDetail));
        assert_eq!("GET_MATCH_DETAIL;12".parse(), Ok(Command::GetMatchDetail(Some(12))));
        assert_eq!("GET_MATCH_DETAIL;twelve".parse(), Ok(Command::GetMatchDetail(None)));
        assert_eq!(
            "GET_MATCH_DETAIL".parse::<Command>(),
            Err(ProtocolError::MissingField { command: "GET_MATCH_DETAIL", field: "match id" })
        );
        assert_eq!("INVITE;carol".parse(), Ok(Command::Invite(user("carol"))));
    }

    #[test]
    fn test_keyword_matches_wire_spelling() {
        assert_eq!(Command::Create.keyword(), "CREATE");
        assert_eq!(Command::LeaveRoom(None).keyword(), "LEAVE_ROOM");
    }
}
