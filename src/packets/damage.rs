//! Damage application packet
//!
//! Broadcast by the peer whose simulation registered the hit; applied on
//! every other peer by the damage pipeline.

use bytes::Bytes;
use serde::Serialize;

use crate::wire::{DecodeError, WireReader, WireWriter};

use super::{read_header, write_header, BodyPart, ColliderType, DamageType, Packet};

/// Optional aggressor attribution group.
///
/// The weapon id is an instance id meaningful only inside the sender's
/// inventory; receivers derive a local handle from it (see `weapon`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Aggressor {
    pub profile_id: String,
    pub weapon_id: String,
    pub weapon_template: String,
}

/// Replicates one damage event against the subject player.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApplyDamagePacket {
    /// Profile id of the player taking the damage.
    pub profile_id: String,
    pub damage_type: DamageType,
    pub damage: f32,
    pub body_part: BodyPart,
    pub collider: ColliderType,
    /// Amount soaked by armor before it reached the body part.
    pub absorbed: f32,
    pub aggressor: Option<Aggressor>,
}

impl Packet for ApplyDamagePacket {
    const METHOD: &'static str = "ApplyDamagePacket";

    fn profile_id(&self) -> &str {
        &self.profile_id
    }

    fn encode(&self) -> Bytes {
        let mut writer = WireWriter::new();
        write_header(&mut writer, Self::METHOD, &self.profile_id);
        writer.put_u32(self.damage_type.to_wire());
        writer.put_f32(self.damage);
        writer.put_u8(self.body_part.to_wire());
        writer.put_u8(self.collider.to_wire());
        writer.put_f32(self.absorbed);

        // Optional aggressor group behind a single presence flag.
        writer.put_bool(self.aggressor.is_some());
        if let Some(aggressor) = &self.aggressor {
            writer.put_string(&aggressor.profile_id);
            writer.put_string(&aggressor.weapon_id);
            writer.put_string(&aggressor.weapon_template);
        }
        writer.freeze()
    }

    fn decode(bytes: &[u8]) -> Result<Self, DecodeError> {
        let mut reader = WireReader::new(bytes);
        let profile_id = read_header(&mut reader, Self::METHOD)?;
        let damage_type = DamageType::from_wire(reader.read_u32()?)?;
        let damage = reader.read_f32()?;
        let body_part = BodyPart::from_wire(reader.read_u8()?)?;
        let collider = ColliderType::from_wire(reader.read_u8()?)?;
        let absorbed = reader.read_f32()?;

        let aggressor = if reader.read_bool()? {
            Some(Aggressor {
                profile_id: reader.read_string()?,
                weapon_id: reader.read_string()?,
                weapon_template: reader.read_string()?,
            })
        } else {
            None
        };

        Ok(Self {
            profile_id,
            damage_type,
            damage,
            body_part,
            collider,
            absorbed,
            aggressor,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(aggressor: Option<Aggressor>) -> ApplyDamagePacket {
        ApplyDamagePacket {
            profile_id: "victim-profile".to_string(),
            damage_type: DamageType::Bullet,
            damage: 35.0,
            body_part: BodyPart::Head,
            collider: ColliderType::HeadCommon,
            absorbed: 10.0,
            aggressor,
        }
    }

    #[test]
    fn round_trips_without_aggressor() {
        let packet = sample(None);
        let decoded = ApplyDamagePacket::decode(&packet.encode()).unwrap();
        assert_eq!(decoded, packet);
    }

    #[test]
    fn round_trips_with_aggressor() {
        let packet = sample(Some(Aggressor {
            profile_id: "shooter-profile".to_string(),
            weapon_id: "weapon-instance-77".to_string(),
            weapon_template: "5447a9cd4bdc2dbd208b4567".to_string(),
        }));
        let decoded = ApplyDamagePacket::decode(&packet.encode()).unwrap();
        assert_eq!(decoded, packet);
    }

    #[test]
    fn any_one_byte_truncation_fails_decode() {
        let packet = sample(Some(Aggressor {
            profile_id: "shooter-profile".to_string(),
            weapon_id: "weapon-instance-77".to_string(),
            weapon_template: "5447a9cd4bdc2dbd208b4567".to_string(),
        }));
        let bytes = packet.encode();
        for cut in 0..bytes.len() {
            assert!(
                ApplyDamagePacket::decode(&bytes[..cut]).is_err(),
                "decode unexpectedly succeeded at {cut} of {} bytes",
                bytes.len()
            );
        }
    }

    #[test]
    fn wrong_method_is_a_mismatch_not_a_parse() {
        let mut writer = WireWriter::new();
        write_header(&mut writer, "ProceedWeaponPacket", "victim-profile");
        let err = ApplyDamagePacket::decode(&writer.freeze()).unwrap_err();
        assert!(matches!(err, DecodeError::MethodMismatch { .. }));
    }
}
