//! Post-action state sync and death packets

use bytes::Bytes;
use serde::Serialize;

use crate::wire::{DecodeError, WireReader, WireWriter};

use super::{read_header, write_header, DamageType, Packet};

/// Final item state after a deferred action tears down.
///
/// Clients may disagree about how much of a consumable an animation actually
/// used; this packet makes the actor's inventory authoritative for the item
/// it just acted on.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProceedSyncPacket {
    pub profile_id: String,
    pub item_id: String,
    /// Resource amount remaining after the action.
    pub new_value: f32,
    pub stack_count: i32,
}

impl Packet for ProceedSyncPacket {
    const METHOD: &'static str = "ProceedSyncPacket";

    fn profile_id(&self) -> &str {
        &self.profile_id
    }

    fn encode(&self) -> Bytes {
        let mut writer = WireWriter::new();
        write_header(&mut writer, Self::METHOD, &self.profile_id);
        writer.put_string(&self.item_id);
        writer.put_f32(self.new_value);
        writer.put_i32(self.stack_count);
        writer.freeze()
    }

    fn decode(bytes: &[u8]) -> Result<Self, DecodeError> {
        let mut reader = WireReader::new(bytes);
        let profile_id = read_header(&mut reader, Self::METHOD)?;
        Ok(Self {
            profile_id,
            item_id: reader.read_string()?,
            new_value: reader.read_f32()?,
            stack_count: reader.read_i32()?,
        })
    }
}

/// Announces the subject's death with the damage type that caused it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KillPacket {
    pub profile_id: String,
    pub damage_type: DamageType,
}

impl Packet for KillPacket {
    const METHOD: &'static str = "KillPacket";

    fn profile_id(&self) -> &str {
        &self.profile_id
    }

    fn encode(&self) -> Bytes {
        let mut writer = WireWriter::new();
        write_header(&mut writer, Self::METHOD, &self.profile_id);
        writer.put_u32(self.damage_type.to_wire());
        writer.freeze()
    }

    fn decode(bytes: &[u8]) -> Result<Self, DecodeError> {
        let mut reader = WireReader::new(bytes);
        let profile_id = read_header(&mut reader, Self::METHOD)?;
        Ok(Self {
            profile_id,
            damage_type: DamageType::from_wire(reader.read_u32()?)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sync_round_trip() {
        let packet = ProceedSyncPacket {
            profile_id: "p1".to_string(),
            item_id: "ifak-9".to_string(),
            new_value: 40.0,
            stack_count: 1,
        };
        assert_eq!(ProceedSyncPacket::decode(&packet.encode()).unwrap(), packet);
    }

    #[test]
    fn kill_round_trip_and_truncation() {
        let packet = KillPacket {
            profile_id: "p1".to_string(),
            damage_type: DamageType::GrenadeFragment,
        };
        let bytes = packet.encode();
        assert_eq!(KillPacket::decode(&bytes).unwrap(), packet);
        for cut in 0..bytes.len() {
            assert!(KillPacket::decode(&bytes[..cut]).is_err());
        }
    }
}
