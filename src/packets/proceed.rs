//! Action outcome packets
//!
//! One packet per deferred action kind, emitted by the synchronizer once the
//! local action reaches its confirmation point. Remote peers replay the
//! action on their drone copy of the player.

use bytes::Bytes;
use serde::Serialize;

use crate::wire::{DecodeError, WireReader, WireWriter};

use super::{read_header, write_header, BodyPart, Packet};

/// Consume a food or drink item.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProceedFoodDrinkPacket {
    pub profile_id: String,
    pub item_id: String,
    pub template_id: String,
    /// Portion of the item consumed this use.
    pub amount: f32,
    pub animation_variant: i32,
    pub scheduled: bool,
}

impl Packet for ProceedFoodDrinkPacket {
    const METHOD: &'static str = "ProceedFoodDrinkPacket";

    fn profile_id(&self) -> &str {
        &self.profile_id
    }

    fn encode(&self) -> Bytes {
        let mut writer = WireWriter::new();
        write_header(&mut writer, Self::METHOD, &self.profile_id);
        writer.put_string(&self.item_id);
        writer.put_string(&self.template_id);
        writer.put_f32(self.amount);
        writer.put_i32(self.animation_variant);
        writer.put_bool(self.scheduled);
        writer.freeze()
    }

    fn decode(bytes: &[u8]) -> Result<Self, DecodeError> {
        let mut reader = WireReader::new(bytes);
        let profile_id = read_header(&mut reader, Self::METHOD)?;
        Ok(Self {
            profile_id,
            item_id: reader.read_string()?,
            template_id: reader.read_string()?,
            amount: reader.read_f32()?,
            animation_variant: reader.read_i32()?,
            scheduled: reader.read_bool()?,
        })
    }
}

/// Apply a medical item to a body part.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProceedMedsPacket {
    pub profile_id: String,
    pub item_id: String,
    pub template_id: String,
    pub body_part: BodyPart,
    pub animation_variant: i32,
    pub scheduled: bool,
    pub amount: f32,
}

impl Packet for ProceedMedsPacket {
    const METHOD: &'static str = "ProceedMedsPacket";

    fn profile_id(&self) -> &str {
        &self.profile_id
    }

    fn encode(&self) -> Bytes {
        let mut writer = WireWriter::new();
        write_header(&mut writer, Self::METHOD, &self.profile_id);
        writer.put_string(&self.item_id);
        writer.put_string(&self.template_id);
        writer.put_u8(self.body_part.to_wire());
        writer.put_i32(self.animation_variant);
        writer.put_bool(self.scheduled);
        writer.put_f32(self.amount);
        writer.freeze()
    }

    fn decode(bytes: &[u8]) -> Result<Self, DecodeError> {
        let mut reader = WireReader::new(bytes);
        let profile_id = read_header(&mut reader, Self::METHOD)?;
        Ok(Self {
            profile_id,
            item_id: reader.read_string()?,
            template_id: reader.read_string()?,
            body_part: BodyPart::from_wire(reader.read_u8()?)?,
            animation_variant: reader.read_i32()?,
            scheduled: reader.read_bool()?,
            amount: reader.read_f32()?,
        })
    }
}

/// Draw a firearm.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProceedWeaponPacket {
    pub profile_id: String,
    pub item_id: String,
    pub scheduled: bool,
}

impl Packet for ProceedWeaponPacket {
    const METHOD: &'static str = "ProceedWeaponPacket";

    fn profile_id(&self) -> &str {
        &self.profile_id
    }

    fn encode(&self) -> Bytes {
        let mut writer = WireWriter::new();
        write_header(&mut writer, Self::METHOD, &self.profile_id);
        writer.put_string(&self.item_id);
        writer.put_bool(self.scheduled);
        writer.freeze()
    }

    fn decode(bytes: &[u8]) -> Result<Self, DecodeError> {
        let mut reader = WireReader::new(bytes);
        let profile_id = read_header(&mut reader, Self::METHOD)?;
        Ok(Self {
            profile_id,
            item_id: reader.read_string()?,
            scheduled: reader.read_bool()?,
        })
    }
}

/// Draw a knife, or perform the quick melee swing when `quick_knife` is set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProceedKnifePacket {
    pub profile_id: String,
    pub item_id: String,
    pub scheduled: bool,
    pub quick_knife: bool,
}

impl Packet for ProceedKnifePacket {
    const METHOD: &'static str = "ProceedKnifePacket";

    fn profile_id(&self) -> &str {
        &self.profile_id
    }

    fn encode(&self) -> Bytes {
        let mut writer = WireWriter::new();
        write_header(&mut writer, Self::METHOD, &self.profile_id);
        writer.put_string(&self.item_id);
        writer.put_bool(self.scheduled);
        writer.put_bool(self.quick_knife);
        writer.freeze()
    }

    fn decode(bytes: &[u8]) -> Result<Self, DecodeError> {
        let mut reader = WireReader::new(bytes);
        let profile_id = read_header(&mut reader, Self::METHOD)?;
        Ok(Self {
            profile_id,
            item_id: reader.read_string()?,
            scheduled: reader.read_bool()?,
            quick_knife: reader.read_bool()?,
        })
    }
}

/// Ready a grenade for throwing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProceedGrenadePacket {
    pub profile_id: String,
    pub item_id: String,
    pub scheduled: bool,
}

impl Packet for ProceedGrenadePacket {
    const METHOD: &'static str = "ProceedGrenadePacket";

    fn profile_id(&self) -> &str {
        &self.profile_id
    }

    fn encode(&self) -> Bytes {
        let mut writer = WireWriter::new();
        write_header(&mut writer, Self::METHOD, &self.profile_id);
        writer.put_string(&self.item_id);
        writer.put_bool(self.scheduled);
        writer.freeze()
    }

    fn decode(bytes: &[u8]) -> Result<Self, DecodeError> {
        let mut reader = WireReader::new(bytes);
        let profile_id = read_header(&mut reader, Self::METHOD)?;
        Ok(Self {
            profile_id,
            item_id: reader.read_string()?,
            scheduled: reader.read_bool()?,
        })
    }
}
