//! Fixed sector topology of the Sortic track.
//!
//! The track has two handover areas (Sortic and Transfer), each reached
//! through a single-vehicle gateway, joined by a transit lane:
//!
//! ```text
//! SorticHandover ─ SorticToHandover ─ SorticWaitForGateway ─ [SorticGateway]
//!                                                                 │
//!                         TransitWaitForGatewaySortic ─ TransitToSortic
//!                                                                 │   Parking
//!                       TransitToTransfer ─ TransitWaitForGatewayTransfer
//!                                                                 │
//! TransferHandover ─ TransferToHandover ─ TransferWaitForGateway ─ [TransferGateway]
//! ```
//!
//! Each sector has a stable text label used in logs and on the wire.

use std::fmt;
use std::str::FromStr;

/// Named physical zone of the track.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Sector {
    SorticHandover,
    SorticToHandover,
    SorticWaitForGateway,
    SorticGateway,
    TransitWaitForGatewaySortic,
    TransitToSortic,
    TransitToTransfer,
    /// Reserved, no route passes through it yet
    Parking,
    TransitWaitForGatewayTransfer,
    TransferGateway,
    TransferWaitForGateway,
    TransferToHandover,
    TransferHandover,
    /// Result of decoding an unrecognized label
    Unknown,
}

impl Sector {
    /// Every sector, `Unknown` last.
    pub const ALL: [Sector; 14] = [
        Sector::SorticHandover,
        Sector::SorticToHandover,
        Sector::SorticWaitForGateway,
        Sector::SorticGateway,
        Sector::TransitWaitForGatewaySortic,
        Sector::TransitToSortic,
        Sector::TransitToTransfer,
        Sector::Parking,
        Sector::TransitWaitForGatewayTransfer,
        Sector::TransferGateway,
        Sector::TransferWaitForGateway,
        Sector::TransferToHandover,
        Sector::TransferHandover,
        Sector::Unknown,
    ];

    /// Text label of the sector.
    pub fn label(self) -> &'static str {
        match self {
            Sector::SorticHandover => "SorticHandover",
            Sector::SorticToHandover => "SorticToHandover",
            Sector::SorticWaitForGateway => "SorticWaitForGateway",
            Sector::SorticGateway => "SorticGateway",
            Sector::TransitWaitForGatewaySortic => "TransitWaitForGatewaySortic",
            Sector::TransitToSortic => "TransitToSortic",
            Sector::TransitToTransfer => "TransitToTransfer",
            Sector::Parking => "Parking",
            Sector::TransitWaitForGatewayTransfer => "TransitWaitForGatewayTransfer",
            Sector::TransferGateway => "TransferGateway",
            Sector::TransferWaitForGateway => "TransferWaitForGateway",
            Sector::TransferToHandover => "TransferToHandover",
            Sector::TransferHandover => "TransferHandover",
            Sector::Unknown => "Unknown",
        }
    }

    /// Decode a label. Anything unrecognized becomes [`Sector::Unknown`].
    pub fn from_label(label: &str) -> Sector {
        let label = label.trim();
        Sector::ALL
            .iter()
            .copied()
            .find(|s| s.label() == label)
            .unwrap_or(Sector::Unknown)
    }

    /// False only for [`Sector::Unknown`].
    pub fn is_known(self) -> bool {
        self != Sector::Unknown
    }

    /// Handover sectors are the only places a journey may start or end.
    pub fn is_end_point(self) -> bool {
        matches!(self, Sector::SorticHandover | Sector::TransferHandover)
    }

    /// Sectors on the transit lane between the two gateways.
    pub fn is_transit(self) -> bool {
        matches!(
            self,
            Sector::TransitWaitForGatewaySortic
                | Sector::TransitToSortic
                | Sector::TransitToTransfer
                | Sector::Parking
                | Sector::TransitWaitForGatewayTransfer
        )
    }

    /// Side whose gateway this sector belongs to or leads to.
    ///
    /// Transit sectors report the side they are heading for.
    /// `Parking` and `Unknown` have no side.
    pub fn side(self) -> Option<Side> {
        match self {
            Sector::SorticHandover
            | Sector::SorticToHandover
            | Sector::SorticWaitForGateway
            | Sector::SorticGateway
            | Sector::TransitWaitForGatewaySortic
            | Sector::TransitToSortic => Some(Side::Sortic),
            Sector::TransferHandover
            | Sector::TransferToHandover
            | Sector::TransferWaitForGateway
            | Sector::TransferGateway
            | Sector::TransitWaitForGatewayTransfer
            | Sector::TransitToTransfer => Some(Side::Transfer),
            Sector::Parking | Sector::Unknown => None,
        }
    }
}

impl fmt::Display for Sector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Sector {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Sector::from_label(s))
    }
}

/// Sector to label.
pub fn encode_sector(sector: Sector) -> &'static str {
    sector.label()
}

/// Label to sector, `Unknown` for unrecognized labels.
pub fn decode_sector(label: &str) -> Sector {
    Sector::from_label(label)
}

/// One half of the track, each with its own handover area and gateway.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Side {
    Sortic,
    Transfer,
}

impl Side {
    pub fn opposite(self) -> Side {
        match self {
            Side::Sortic => Side::Transfer,
            Side::Transfer => Side::Sortic,
        }
    }

    pub fn handover(self) -> Sector {
        match self {
            Side::Sortic => Sector::SorticHandover,
            Side::Transfer => Sector::TransferHandover,
        }
    }

    pub fn to_handover(self) -> Sector {
        match self {
            Side::Sortic => Sector::SorticToHandover,
            Side::Transfer => Sector::TransferToHandover,
        }
    }

    /// Waiting zone on the handover side of the gateway.
    pub fn wait_for_gateway(self) -> Sector {
        match self {
            Side::Sortic => Sector::SorticWaitForGateway,
            Side::Transfer => Sector::TransferWaitForGateway,
        }
    }

    pub fn gateway(self) -> Sector {
        match self {
            Side::Sortic => Sector::SorticGateway,
            Side::Transfer => Sector::TransferGateway,
        }
    }

    /// Waiting zone on the transit side of the gateway.
    pub fn transit_wait(self) -> Sector {
        match self {
            Side::Sortic => Sector::TransitWaitForGatewaySortic,
            Side::Transfer => Sector::TransitWaitForGatewayTransfer,
        }
    }

    /// Transit lane heading toward this side.
    pub fn transit_toward(self) -> Sector {
        match self {
            Side::Sortic => Sector::TransitToSortic,
            Side::Transfer => Sector::TransitToTransfer,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Sortic => f.write_str("Sortic"),
            Side::Transfer => f.write_str("Transfer"),
        }
    }
}
