//! Hardware formats of the hashed MMU: page table entries, SDR1 and segment
//! registers.
//!
//! Bit positions follow the OEA books, translated to LSB-0 offsets (the
//! books number bit 0 as the MSB).

use core::{
    fmt,
    sync::atomic::{AtomicU32, Ordering, fence},
};

use bitflags::bitflags;
use static_assertions::assert_eq_size;
use tock_registers::{
    interfaces::{ReadWriteable, Readable, Writeable},
    register_bitfields,
    registers::InMemoryRegister,
};

use crate::memory::{
    address::{PA, PageFrame, VA},
    address_space::Asid,
};

register_bitfields![u32,
    PteWord0 [
        VALID OFFSET(31) NUMBITS(1) [],
        VSID  OFFSET(7)  NUMBITS(24) [],
        HASH  OFFSET(6)  NUMBITS(1) [
            Primary = 0,
            Secondary = 1,
        ],
        API   OFFSET(0)  NUMBITS(6) []
    ],
    PteWord1 [
        RPN        OFFSET(12) NUMBITS(20) [],
        REFERENCED OFFSET(8)  NUMBITS(1) [],
        CHANGED    OFFSET(7)  NUMBITS(1) [],
        WIMG       OFFSET(3)  NUMBITS(4) [],
        PP         OFFSET(0)  NUMBITS(2) []
    ],
    SegmentFields [
        DIRECT_STORE OFFSET(31) NUMBITS(1) [],
        KS           OFFSET(30) NUMBITS(1) [],
        KP           OFFSET(29) NUMBITS(1) [],
        NO_EXECUTE   OFFSET(28) NUMBITS(1) [],
        VSID         OFFSET(0)  NUMBITS(24) []
    ],
    Sdr1Fields [
        HTABORG  OFFSET(16) NUMBITS(16) [],
        HTABMASK OFFSET(0)  NUMBITS(9) []
    ]
];

/// Virtual segment identifier: the 24-bit tag every slot carries so that one
/// table can serve all address spaces.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Vsid(u32);

impl Vsid {
    pub const MASK: u32 = 0x00ff_ffff;

    pub const fn new(vsid: u32) -> Self {
        Self(vsid & Self::MASK)
    }

    /// The VSID loaded into segment register `segment` for `asid`. Sixteen
    /// consecutive VSIDs belong to every address space.
    pub const fn for_segment(asid: Asid, segment: usize) -> Self {
        Self::new((asid.value() << 4) | (segment as u32 & 0xf))
    }

    pub const fn value(self) -> u32 {
        self.0
    }
}

impl fmt::Debug for Vsid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Vsid({:#x})", self.0)
    }
}

/// Abbreviated page index: the top six bits of the 16-bit page index. The
/// low ten are implied by the group a slot sits in.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Api(u8);

impl Api {
    pub const fn new(api: u8) -> Self {
        Self(api & 0x3f)
    }

    pub const fn from_va(va: VA) -> Self {
        Self::new((va.value() >> 22) as u8)
    }

    pub const fn value(self) -> u8 {
        self.0
    }
}

impl fmt::Debug for Api {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Api({:#x})", self.0)
    }
}

/// The PP field. What each class permits depends on the key (Ks/Kp) of the
/// segment the access goes through.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u32)]
pub enum PageProtection {
    /// Read/write with key 0, no access with key 1.
    SupervisorOnly = 0b00,
    /// Read/write with key 0, read-only with key 1.
    UserReadOnly = 0b01,
    /// Read/write for both keys.
    ReadWrite = 0b10,
    /// Read-only for both keys.
    ReadOnly = 0b11,
}

impl PageProtection {
    pub const fn from_bits(bits: u32) -> Self {
        match bits & 0b11 {
            0b00 => Self::SupervisorOnly,
            0b01 => Self::UserReadOnly,
            0b10 => Self::ReadWrite,
            _ => Self::ReadOnly,
        }
    }
}

bitflags! {
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct Wimg: u32 {
        const WRITE_THROUGH = 0b1000;
        const CACHE_INHIBITED = 0b0100;
        const MEMORY_COHERENT = 0b0010;
        const GUARDED = 0b0001;
    }
}

/// Value of one PHT slot: two words, exactly as the MMU reads them.
#[derive(Clone, Copy, PartialEq, Eq, Default)]
pub struct PhtEntry {
    word0: u32,
    word1: u32,
}

impl PhtEntry {
    pub const fn invalid() -> Self {
        Self { word0: 0, word1: 0 }
    }

    pub const fn from_raw(word0: u32, word1: u32) -> Self {
        Self { word0, word1 }
    }

    pub const fn as_raw(self) -> (u32, u32) {
        (self.word0, self.word1)
    }

    /// A valid primary-hash translation with R and C clear and default WIMG.
    pub fn new_primary(vsid: Vsid, api: Api, frame: PageFrame, pp: PageProtection) -> Self {
        debug_assert!(frame.value() < 1 << 20, "frame {frame:?} beyond the 32-bit RPN");

        let word0 = InMemoryRegister::<u32, PteWord0::Register>::new(0);
        word0.write(
            PteWord0::VALID::SET
                + PteWord0::VSID.val(vsid.value())
                + PteWord0::HASH::Primary
                + PteWord0::API.val(api.value() as u32),
        );

        let word1 = InMemoryRegister::<u32, PteWord1::Register>::new(0);
        word1.write(
            PteWord1::RPN.val(frame.value() as u32)
                + PteWord1::REFERENCED::CLEAR
                + PteWord1::CHANGED::CLEAR
                + PteWord1::PP.val(pp as u32),
        );

        Self {
            word0: word0.get(),
            word1: word1.get(),
        }
    }

    fn word0(self) -> InMemoryRegister<u32, PteWord0::Register> {
        InMemoryRegister::new(self.word0)
    }

    fn word1(self) -> InMemoryRegister<u32, PteWord1::Register> {
        InMemoryRegister::new(self.word1)
    }

    pub fn is_valid(self) -> bool {
        self.word0().is_set(PteWord0::VALID)
    }

    /// A slot some writer has claimed but not yet published: V clear, H set.
    /// Never installed otherwise, and the MMU skips it since V is clear.
    pub fn is_busy(self) -> bool {
        !self.is_valid() && self.is_secondary()
    }

    pub fn vsid(self) -> Vsid {
        Vsid::new(self.word0().read(PteWord0::VSID))
    }

    pub fn api(self) -> Api {
        Api::new(self.word0().read(PteWord0::API) as u8)
    }

    /// Whether the slot was installed under the secondary hash.
    pub fn is_secondary(self) -> bool {
        self.word0().is_set(PteWord0::HASH)
    }

    pub fn frame(self) -> PageFrame {
        PageFrame::from_pfn(self.word1().read(PteWord1::RPN) as usize)
    }

    pub fn is_referenced(self) -> bool {
        self.word1().is_set(PteWord1::REFERENCED)
    }

    pub fn is_changed(self) -> bool {
        self.word1().is_set(PteWord1::CHANGED)
    }

    pub fn wimg(self) -> Wimg {
        Wimg::from_bits_truncate(self.word1().read(PteWord1::WIMG))
    }

    pub fn protection(self) -> PageProtection {
        PageProtection::from_bits(self.word1().read(PteWord1::PP))
    }

    /// Whether a primary-hash search for (`vsid`, `api`) would hit this slot.
    pub fn matches(self, vsid: Vsid, api: Api) -> bool {
        self.is_valid() && !self.is_secondary() && self.vsid() == vsid && self.api() == api
    }
}

impl fmt::Debug for PhtEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_busy() {
            return f.write_str("PhtEntry(busy)");
        }

        if !self.is_valid() {
            return f.write_str("PhtEntry(invalid)");
        }

        f.debug_struct("PhtEntry")
            .field("vsid", &self.vsid())
            .field("h", &self.is_secondary())
            .field("api", &self.api())
            .field("frame", &self.frame())
            .field("r", &self.is_referenced())
            .field("c", &self.is_changed())
            .field("wimg", &self.wimg())
            .field("pp", &self.protection())
            .finish()
    }
}

/// One slot of the table in memory. The MMU reads these concurrently with
/// software, so both words are only accessed atomically.
#[repr(C)]
pub struct PhtSlot {
    word0: AtomicU32,
    word1: AtomicU32,
}

assert_eq_size!(PhtSlot, u64);

impl PhtSlot {
    pub fn load(&self) -> PhtEntry {
        let word0 = self.word0.load(Ordering::Acquire);
        let word1 = self.word1.load(Ordering::Relaxed);
        PhtEntry::from_raw(word0, word1)
    }

    pub fn is_valid(&self) -> bool {
        self.load().is_valid()
    }

    /// Takes the slot over for writing, provided it still holds `observed`.
    ///
    /// Fails if another writer got there first, or if `observed` is itself a
    /// claim in progress. On success the slot reads as busy (not valid) until
    /// the claim is published.
    pub fn claim(&self, observed: PhtEntry) -> Option<SlotClaim<'_>> {
        if observed.is_busy() {
            return None;
        }

        let (expected, _) = observed.as_raw();

        self.word0
            .compare_exchange(expected, BUSY_WORD0, Ordering::AcqRel, Ordering::Acquire)
            .ok()?;

        // The busy tag must be visible before word 1 starts changing.
        fence(Ordering::Release);

        Some(SlotClaim { slot: self })
    }

    /// Overwrites the slot. Only for a writer that owns the slot outright,
    /// e.g. during bring-up; concurrent writers go through [`Self::claim`].
    pub fn store(&self, entry: PhtEntry) {
        let (word0, word1) = entry.as_raw();

        self.word0.store(BUSY_WORD0, Ordering::Relaxed);
        fence(Ordering::Release);
        self.word1.store(word1, Ordering::Relaxed);
        self.word0.store(word0, Ordering::Release);
    }

    pub fn clear(&self) {
        self.word0.store(0, Ordering::Relaxed);
        self.word1.store(0, Ordering::Relaxed);
    }
}

const BUSY_WORD0: u32 = 1 << 6;

/// Exclusive write access to one slot, obtained from [`PhtSlot::claim`].
#[must_use]
pub struct SlotClaim<'a> {
    slot: &'a PhtSlot,
}

impl SlotClaim<'_> {
    /// Writes `entry` and makes it visible. Word 1 goes in first; V is raised
    /// only by the final word 0 update.
    ///
    /// Returns false if the slot was wiped while claimed (a full table
    /// invalidation); the entry is then dropped and the slot stays free.
    pub fn publish(self, entry: PhtEntry) -> bool {
        let (word0, word1) = entry.as_raw();

        self.slot.word1.store(word1, Ordering::Relaxed);
        self.slot
            .word0
            .compare_exchange(BUSY_WORD0, word0, Ordering::Release, Ordering::Relaxed)
            .is_ok()
    }
}

/// SDR1: physical origin and size mask of the hash table.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Sdr1(u32);

impl Sdr1 {
    /// Encodes a table of `size` bytes at `base`. Both must already satisfy
    /// the architecture's constraints (power of two, at least 64 KiB,
    /// self-aligned).
    pub fn new(base: PA, size: usize) -> Self {
        debug_assert!(size.is_power_of_two() && size >= 1 << 16);
        debug_assert!(base.is_aligned(size));

        let reg = InMemoryRegister::<u32, Sdr1Fields::Register>::new(0);
        reg.write(
            Sdr1Fields::HTABORG.val((base.value() >> 16) as u32)
                + Sdr1Fields::HTABMASK.val(((size >> 16) - 1) as u32),
        );
        Self(reg.get())
    }

    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    pub const fn as_raw(self) -> u32 {
        self.0
    }

    pub fn table_origin(self) -> PA {
        let reg = InMemoryRegister::<u32, Sdr1Fields::Register>::new(self.0);
        PA::from_value((reg.read(Sdr1Fields::HTABORG) as usize) << 16)
    }

    pub fn table_size(self) -> usize {
        let reg = InMemoryRegister::<u32, Sdr1Fields::Register>::new(self.0);
        (reg.read(Sdr1Fields::HTABMASK) as usize + 1) << 16
    }
}

impl fmt::Debug for Sdr1 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Sdr1({:#010x})", self.0)
    }
}

/// Contents of one of the sixteen segment registers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SegmentRegister(u32);

impl SegmentRegister {
    /// A page-translated segment. `user_key` selects Kp, the key used for
    /// problem-state accesses.
    pub fn new(vsid: Vsid, user_key: bool) -> Self {
        let reg = InMemoryRegister::<u32, SegmentFields::Register>::new(0);
        reg.write(SegmentFields::VSID.val(vsid.value()));
        if user_key {
            reg.modify(SegmentFields::KP::SET);
        }
        Self(reg.get())
    }

    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    pub const fn as_raw(self) -> u32 {
        self.0
    }

    pub fn vsid(self) -> Vsid {
        let reg = InMemoryRegister::<u32, SegmentFields::Register>::new(self.0);
        Vsid::new(reg.read(SegmentFields::VSID))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primary_entry_bit_layout() {
        let entry = PhtEntry::new_primary(
            Vsid::new(5),
            Api::new(0x2a),
            PageFrame::from_pfn(0xabcde),
            PageProtection::ReadWrite,
        );

        assert_eq!(entry.as_raw(), (0x8000_02aa, 0xabcd_e002));
        assert!(entry.is_valid());
        assert!(!entry.is_secondary());
        assert_eq!(entry.vsid(), Vsid::new(5));
        assert_eq!(entry.api(), Api::new(0x2a));
        assert_eq!(entry.frame(), PageFrame::from_pfn(0xabcde));
        assert!(!entry.is_referenced());
        assert!(!entry.is_changed());
        assert_eq!(entry.wimg(), Wimg::empty());
        assert_eq!(entry.protection(), PageProtection::ReadWrite);
    }

    #[test]
    fn decodes_hardware_written_bits() {
        // Secondary hash, R and C set by the MMU, cache-inhibited + guarded.
        let entry = PhtEntry::from_raw(0xffff_ffff, 0x0000_11ab);

        assert!(entry.is_valid());
        assert_eq!(entry.vsid(), Vsid::new(0xff_ffff));
        assert!(entry.is_secondary());
        assert_eq!(entry.api(), Api::new(0x3f));
        assert_eq!(entry.frame(), PageFrame::from_pfn(0x1));
        assert!(entry.is_referenced());
        assert!(entry.is_changed());
        assert_eq!(entry.wimg(), Wimg::CACHE_INHIBITED | Wimg::GUARDED);
        assert_eq!(entry.protection(), PageProtection::ReadOnly);
    }

    #[test]
    fn vsid_is_truncated_to_24_bits() {
        assert_eq!(Vsid::new(0x1234_5678).value(), 0x34_5678);
        assert_eq!(Vsid::for_segment(Asid::new(0x12), 3), Vsid::new(0x123));
    }

    #[test]
    fn api_comes_from_top_of_page_index() {
        assert_eq!(Api::from_va(VA::from_value(0x0fc0_0000)), Api::new(0x3f));
        assert_eq!(Api::from_va(VA::from_value(0x003f_f000)), Api::new(0));
        assert_eq!(Api::from_va(VA::from_value(0xf040_0000)), Api::new(1));
    }

    #[test]
    fn matches_requires_valid_primary_and_tag() {
        let vsid = Vsid::new(0x77);
        let api = Api::new(3);
        let entry = PhtEntry::new_primary(vsid, api, PageFrame::from_pfn(1), PageProtection::ReadWrite);

        assert!(entry.matches(vsid, api));
        assert!(!entry.matches(Vsid::new(0x78), api));
        assert!(!entry.matches(vsid, Api::new(4)));

        let (w0, w1) = entry.as_raw();
        assert!(!PhtEntry::from_raw(w0 | 1 << 6, w1).matches(vsid, api));
        assert!(!PhtEntry::from_raw(w0 & !(1 << 31), w1).matches(vsid, api));
    }

    fn empty_slot() -> PhtSlot {
        PhtSlot {
            word0: AtomicU32::new(0),
            word1: AtomicU32::new(0),
        }
    }

    fn entry(vsid: u32, api: u8, pfn: usize) -> PhtEntry {
        PhtEntry::new_primary(
            Vsid::new(vsid),
            Api::new(api),
            PageFrame::from_pfn(pfn),
            PageProtection::ReadWrite,
        )
    }

    #[test]
    fn slot_store_and_clear() {
        let slot = empty_slot();
        assert!(!slot.is_valid());

        let entry = entry(9, 1, 0x42);
        slot.store(entry);
        assert_eq!(slot.load(), entry);

        slot.clear();
        assert_eq!(slot.load(), PhtEntry::invalid());
    }

    #[test]
    fn claimed_slot_reads_busy_until_published() {
        let slot = empty_slot();

        let claim = slot.claim(slot.load()).unwrap();
        let seen = slot.load();
        assert!(seen.is_busy());
        assert!(!seen.is_valid());
        assert_eq!(format!("{seen:?}"), "PhtEntry(busy)");

        assert!(claim.publish(entry(9, 1, 0x42)));
        assert_eq!(slot.load(), entry(9, 1, 0x42));
        assert!(!slot.load().is_busy());
    }

    #[test]
    fn second_writer_on_same_free_slot_loses() {
        let slot = empty_slot();
        let x = entry(5, 1, 0x1000);
        let y = entry(0x405, 1, 0x2000);

        // Both writers picked the slot while it was free.
        let seen_by_x = slot.load();
        let seen_by_y = slot.load();

        let claim_x = slot.claim(seen_by_x).unwrap();
        assert!(slot.claim(seen_by_y).is_none());

        // Y rescans and finds the slot busy; that is not claimable either.
        assert!(slot.claim(slot.load()).is_none());

        assert!(claim_x.publish(x));
        let installed = slot.load();
        assert_eq!(installed, x);
        assert_eq!(installed.frame(), x.frame());
        assert_ne!(installed.frame(), y.frame());
    }

    #[test]
    fn second_evictor_of_same_victim_loses() {
        let slot = empty_slot();
        let victim = entry(7, 3, 0x77);
        slot.store(victim);

        let seen_by_x = slot.load();
        let seen_by_y = slot.load();
        assert_eq!(seen_by_x, victim);

        let claim_x = slot.claim(seen_by_x).unwrap();
        assert!(slot.claim(seen_by_y).is_none());
        assert!(claim_x.publish(entry(5, 3, 0x1003)));

        // Y's view of the slot is stale now that X has replaced it.
        assert!(slot.claim(seen_by_y).is_none());
        assert_eq!(slot.load(), entry(5, 3, 0x1003));
    }

    #[test]
    fn publish_after_wipe_is_dropped() {
        let slot = empty_slot();

        let claim = slot.claim(slot.load()).unwrap();
        slot.clear();

        assert!(!claim.publish(entry(9, 1, 0x42)));
        assert!(!slot.is_valid());
        assert!(!slot.load().is_busy());
        assert!(slot.claim(slot.load()).is_some());
    }

    #[test]
    fn sdr1_encoding() {
        let sdr1 = Sdr1::new(PA::from_value(0x0030_0000), 0x1_0000);
        assert_eq!(sdr1.as_raw(), 0x0030_0000);
        assert_eq!(sdr1.table_origin(), PA::from_value(0x0030_0000));
        assert_eq!(sdr1.table_size(), 0x1_0000);

        let sdr1 = Sdr1::new(PA::from_value(0x0040_0000), 0x2_0000);
        assert_eq!(sdr1.as_raw(), 0x0040_0001);
        assert_eq!(sdr1.table_size(), 0x2_0000);
    }

    #[test]
    fn segment_register_encoding() {
        let sr = SegmentRegister::new(Vsid::new(0x123), true);
        assert_eq!(sr.as_raw(), 0x2000_0123);
        assert_eq!(sr.vsid(), Vsid::new(0x123));

        let sr = SegmentRegister::new(Vsid::new(0x123), false);
        assert_eq!(sr.as_raw(), 0x0000_0123);
        assert_eq!(SegmentRegister::from_raw(0xe0ab_cdef).vsid(), Vsid::new(0xab_cdef));
    }
}
