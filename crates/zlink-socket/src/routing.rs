use std::collections::HashMap;

use mio::Token;

/// Maps routing ids to the reactor token of the peer they identify, and
/// back. Backed by hash maps rather than a small linear table: a
/// general-purpose STREAM socket has no bound on peer count the way a
/// handful of long-lived trading links would.
#[derive(Debug, Default)]
pub struct RoutingTable {
    rid_to_token: HashMap<u32, Token>,
    token_to_rid: HashMap<Token, u32>,
    next_rid: u32,
}

impl RoutingTable {
    #[must_use]
    pub fn new() -> Self {
        Self { rid_to_token: HashMap::new(), token_to_rid: HashMap::new(), next_rid: 1 }
    }

    /// Attach a peer, assigning it a fresh routing id. A STREAM socket
    /// never honors a caller-supplied id for an attached peer — every
    /// peer, inbound or outbound, is auto-assigned. The counter wraps at
    /// `u32::MAX` and skips any value already in use.
    pub fn attach(&mut self, token: Token) -> u32 {
        let rid = self.next_free_rid();
        self.rid_to_token.insert(rid, token);
        self.token_to_rid.insert(token, rid);
        rid
    }

    fn next_free_rid(&mut self) -> u32 {
        loop {
            let candidate = self.next_rid;
            self.next_rid = self.next_rid.wrapping_add(1);
            if self.next_rid == 0 {
                self.next_rid = 1;
            }
            if !self.rid_to_token.contains_key(&candidate) && candidate != 0 {
                return candidate;
            }
        }
    }

    pub fn detach_by_token(&mut self, token: Token) -> Option<u32> {
        let rid = self.token_to_rid.remove(&token)?;
        self.rid_to_token.remove(&rid);
        Some(rid)
    }

    #[must_use]
    pub fn token_for(&self, rid: u32) -> Option<Token> {
        self.rid_to_token.get(&rid).copied()
    }

    #[must_use]
    pub fn rid_for(&self, token: Token) -> Option<u32> {
        self.token_to_rid.get(&token).copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rid_to_token.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rid_to_token.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assigns_increasing_routing_ids() {
        let mut table = RoutingTable::new();
        let a = table.attach(Token(0));
        let b = table.attach(Token(1));
        assert_ne!(a, b);
    }

    #[test]
    fn detach_frees_the_routing_id_for_reuse_tracking() {
        let mut table = RoutingTable::new();
        let rid = table.attach(Token(0));
        assert_eq!(table.detach_by_token(Token(0)), Some(rid));
        assert_eq!(table.token_for(rid), None);
        assert!(table.is_empty());
    }

    #[test]
    fn counter_wraps_without_emitting_zero() {
        let mut table = RoutingTable::new();
        table.next_rid = u32::MAX;
        let rid = table.attach(Token(0));
        assert_eq!(rid, u32::MAX);
        let rid2 = table.attach(Token(1));
        assert_eq!(rid2, 1);
    }
}
