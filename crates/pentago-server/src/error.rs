use pentago_core::{Capability, MoveError, ProtocolError};

/// Every way a client request can fail.
///
/// The connection task matches on this exhaustively to decide whether the
/// client gets a reply or the request is silently dropped.
#[derive(Debug, thiserror::Error)]
pub enum GameError {
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error("name {0:?} is already logged in")]
    NameTaken(String),

    #[error("Invalid move: {0}")]
    IllegalMove(#[from] MoveError),

    #[error("Not your turn")]
    TurnOrder,

    #[error("client did not announce the {} extension", .0.token())]
    Capability(Capability),
}

pub(crate) fn out_of_sequence(command: &'static str, reason: &'static str) -> GameError {
    GameError::Protocol(ProtocolError::OutOfSequence { command, reason })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejection_reasons() {
        assert_eq!(GameError::TurnOrder.to_string(), "Not your turn");
        assert_eq!(
            GameError::IllegalMove(MoveError::Occupied(7)).to_string(),
            "Invalid move: field 7 is already taken"
        );
        assert_eq!(
            out_of_sequence("MOVE", "outside a match").to_string(),
            "MOVE is not allowed outside a match"
        );
        assert_eq!(
            GameError::Capability(Capability::Chat).to_string(),
            "client did not announce the CHAT extension"
        );
    }
}
