#![allow(missing_docs)]

/// A `COPY ... WITH (FORMAT csv, HEADER)` stream as it arrives off the wire:
/// chunk boundaries fall inside fields, quotes and escapes.
pub const CSV_STREAM: [&str; 6] = [
    "id,name,notes\n1,",
    "\"Ada\",\"multi\nli",
    "ne\"\n2,Bob,\n3,\"Q\"\"uote",
    "\",\"\"\n4,\"a,b\"",
    ",x\n",
    "\\.\n",
];

/// The same kind of stream in the tab separated text format.
pub const TEXT_STREAM: [&str; 3] = ["1\tAda\t\\N\n2\t", "Bob\t\n", "\\.\n"];
