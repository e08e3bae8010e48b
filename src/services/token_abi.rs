// Call encoders for the EVM token standards. Return data is decoded by hand in
// the introspector so non-conforming contracts can still be read.

pub mod erc20 {
    ethers::contract::abigen!(
        Erc20,
        r#"[
            function name() view returns (string)
            function symbol() view returns (string)
            function decimals() view returns (uint8)
            function totalSupply() view returns (uint256)
            function balanceOf(address owner) view returns (uint256)
            function transfer(address to, uint256 amount) returns (bool)
        ]"#
    );
}

// Pre-standard tokens (MKR, SAI) that return `bytes32` name and symbol.
pub mod erc20_bytes32 {
    ethers::contract::abigen!(
        Erc20Bytes32,
        r#"[
            function name() view returns (bytes32)
            function symbol() view returns (bytes32)
        ]"#
    );
}

pub mod erc1155 {
    ethers::contract::abigen!(
        Erc1155,
        r#"[
            function name() view returns (string)
            function symbol() view returns (string)
            function totalSupply(uint256 id) view returns (uint256)
            function balanceOf(address account, uint256 id) view returns (uint256)
            function supportsInterface(bytes4 interfaceId) view returns (bool)
            function safeTransferFrom(address from, address to, uint256 id, uint256 amount, bytes data)
        ]"#
    );
}

pub mod erc721 {
    ethers::contract::abigen!(
        Erc721,
        r#"[
            function name() view returns (string)
            function symbol() view returns (string)
            function totalSupply() view returns (uint256)
            function balanceOf(address owner) view returns (uint256)
            function tokenOfOwnerByIndex(address owner, uint256 index) view returns (uint256)
            function supportsInterface(bytes4 interfaceId) view returns (bool)
            function safeTransferFrom(address from, address to, uint256 tokenId)
        ]"#
    );
}
