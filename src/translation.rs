/// A logical address split into page number and in-page offset
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VirtualAddress {
    pub address: usize,
    pub page: usize,
    pub offset: usize,
}

impl VirtualAddress {
    /// Decompose a raw logical address for pages of `page_size` bytes
    pub fn from_raw(address: usize, page_size: usize) -> Self {
        VirtualAddress {
            address,
            page: address / page_size,
            offset: address % page_size,
        }
    }

    /// Rebuild the raw address from its components
    #[inline]
    pub fn to_raw(&self, page_size: usize) -> usize {
        self.page * page_size + self.offset
    }

    /// Physical address of this access once its page sits in `frame`
    #[inline]
    pub fn physical_address(&self, frame: usize, page_size: usize) -> usize {
        frame * page_size + self.offset
    }
}

impl std::fmt::Display for VirtualAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "VA({}) = (p={}, w={})", self.address, self.page, self.offset)
    }
}
