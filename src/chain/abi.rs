//! Bindings for the pot registry contract

use ethers::prelude::abigen;

abigen!(
    PotluckRegistry,
    r#"[
        function potCount() external view returns (uint256)
        function pots(uint256) external view returns (uint256 id, address creator, bytes32 name, uint256 round, uint256 deadline, uint256 balance, address token, uint256 entryAmount, uint256 period, uint256 totalParticipants, uint256 maxParticipants, bool isPublic)
        function getParticipants(uint256 potId) external view returns (address[])
        function triggerPotPayout(uint256 potId) external
        function triggerBatchPayout(uint256[] potIds) external
        event PotCreated(uint256 indexed potId, address indexed creator)
        event PotPayout(uint256 indexed potId, address indexed winner, uint256 amount, uint256 round)
    ]"#
);

/// Decode a `bytes32` pot name, dropping the zero padding
pub fn decode_pot_name(raw: &[u8; 32]) -> String {
    let end = raw.iter().rposition(|b| *b != 0).map(|i| i + 1).unwrap_or(0);
    String::from_utf8_lossy(&raw[..end]).into_owned()
}
