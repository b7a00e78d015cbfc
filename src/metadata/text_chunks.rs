//! Auxiliary text embedded next to the pixels: PNG `tEXt`/`iTXt`/`zTXt`
//! chunks and JPEG `COM` segments. Generator front-ends commonly park
//! their prompt and sampler parameters here.

const PNG_SIGNATURE: [u8; 8] = [137, 80, 78, 71, 13, 10, 26, 10];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextField {
    pub keyword: String,
    pub text: String,
}

pub fn extract_text_fields(bytes: &[u8]) -> Vec<TextField> {
    if bytes.starts_with(&PNG_SIGNATURE) {
        png_text_chunks(bytes)
    } else if bytes.starts_with(&[0xFF, 0xD8]) {
        jpeg_comments(bytes)
    } else {
        Vec::new()
    }
}

fn latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| b as char).collect()
}

fn split_nul(data: &[u8]) -> (&[u8], &[u8]) {
    match data.iter().position(|&b| b == 0) {
        Some(pos) => (&data[..pos], &data[pos + 1..]),
        None => (data, &[]),
    }
}

fn png_text_chunks(bytes: &[u8]) -> Vec<TextField> {
    let mut fields = Vec::new();
    let mut pos = PNG_SIGNATURE.len();

    while pos + 8 <= bytes.len() {
        let len = u32::from_be_bytes([bytes[pos], bytes[pos + 1], bytes[pos + 2], bytes[pos + 3]])
            as usize;
        let kind = &bytes[pos + 4..pos + 8];
        let start = pos + 8;
        let Some(end) = start.checked_add(len).filter(|&end| end <= bytes.len()) else {
            break;
        };
        let data = &bytes[start..end];

        match kind {
            b"tEXt" => {
                let (keyword, text) = split_nul(data);
                fields.push(TextField {
                    keyword: latin1(keyword),
                    text: latin1(text),
                });
            }
            b"zTXt" => {
                let (keyword, _) = split_nul(data);
                fields.push(TextField {
                    keyword: latin1(keyword),
                    text: String::new(),
                });
            }
            b"iTXt" => {
                let (keyword, rest) = split_nul(data);
                let compressed = rest.first().copied().unwrap_or(0) != 0;
                let rest = rest.get(2..).unwrap_or(&[]);
                let (_language, rest) = split_nul(rest);
                let (_translated, text) = split_nul(rest);
                fields.push(TextField {
                    keyword: String::from_utf8_lossy(keyword).into_owned(),
                    text: if compressed {
                        String::new()
                    } else {
                        String::from_utf8_lossy(text).into_owned()
                    },
                });
            }
            b"IEND" => break,
            _ => {}
        }

        // length + type + data + crc
        pos = end + 4;
    }

    fields
}

fn jpeg_comments(bytes: &[u8]) -> Vec<TextField> {
    let mut fields = Vec::new();
    let mut pos = 2;

    while pos + 1 < bytes.len() {
        if bytes[pos] != 0xFF {
            break;
        }
        let marker = bytes[pos + 1];

        match marker {
            0xFF => {
                pos += 1;
                continue;
            }
            0x01 | 0xD0..=0xD7 => {
                pos += 2;
                continue;
            }
            // start of scan or end of image: no more headers
            0xDA | 0xD9 => break,
            _ => {}
        }

        if pos + 4 > bytes.len() {
            break;
        }
        let len = u16::from_be_bytes([bytes[pos + 2], bytes[pos + 3]]) as usize;
        if len < 2 || pos + 2 + len > bytes.len() {
            break;
        }

        if marker == 0xFE {
            fields.push(TextField {
                keyword: "comment".into(),
                text: String::from_utf8_lossy(&bytes[pos + 4..pos + 2 + len]).into_owned(),
            });
        }

        pos += 2 + len;
    }

    fields
}
