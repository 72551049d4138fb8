//! Drives the range coder over a stream of symbols that share one cumulative-frequency table.
use std::convert::TryFrom;

use num_traits::PrimInt;

use crate::range_coder::{
    CoderConfiguration, Decoded, Precision, RangeDecoder, RangeEncoder,
};
use crate::CoderError;

/// A cumulative-frequency table.
///
/// Holds `num_symbols + 1` non-decreasing boundaries starting at 0 and ending
/// at the denominator. Symbol `s` owns the interval `[prob[s], prob[s + 1])`.
/// Symbols with an empty interval can't be coded.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CumulativeTable {
    prob: Vec<u32>,
}

impl CumulativeTable {
    /// Creates a table from its boundaries.
    pub fn new(prob: &[u32]) -> Result<Self, CoderError> {
        if prob.len() < 2 {
            return Err(CoderError::BadArguments(
                "table needs at least one symbol",
            ));
        }
        if prob[0] != 0 {
            return Err(CoderError::BadArguments("table must start at zero"));
        }
        if prob.windows(2).any(|w| w[0] > w[1]) {
            return Err(CoderError::BadArguments("table must be non-decreasing"));
        }
        if prob[prob.len() - 1] == 0 {
            return Err(CoderError::BadArguments(
                "table denominator must not be zero",
            ));
        }

        Ok(Self {
            prob: prob.to_vec(),
        })
    }

    /// Creates a table from per-symbol frequencies.
    pub fn from_frequencies(frequencies: &[u32]) -> Result<Self, CoderError> {
        let mut prob = Vec::with_capacity(frequencies.len() + 1);
        prob.push(0_u32);
        let mut total = 0_u32;
        for &frequency in frequencies {
            total = total
                .checked_add(frequency)
                .ok_or(CoderError::BadArguments("frequencies overflow"))?;
            prob.push(total);
        }
        Self::new(&prob)
    }

    /// Number of symbols of the alphabet.
    pub fn num_symbols(&self) -> usize {
        self.prob.len() - 1
    }

    /// The sum of all symbol frequencies.
    pub fn denominator(&self) -> u32 {
        self.prob[self.prob.len() - 1]
    }

    /// The boundaries of the table.
    pub fn boundaries(&self) -> &[u32] {
        &self.prob
    }

    /// Returns the interval `[low, high)` of a symbol.
    ///
    /// The symbol must be smaller than `num_symbols()`.
    #[inline(always)]
    pub fn interval(&self, symbol: usize) -> (u32, u32) {
        (self.prob[symbol], self.prob[symbol + 1])
    }

    /// Finds the symbol whose interval contains `code`.
    ///
    /// Returns `None` if `code` isn't smaller than the denominator.
    pub fn find_symbol(&self, code: u32) -> Option<usize> {
        if code >= self.denominator() {
            return None;
        }
        self.prob.partition_point(|&p| p <= code).checked_sub(1)
    }

    /// Linear scan with the same result as `find_symbol()`.
    pub fn find_symbol_linear(&self, code: u32) -> Option<usize> {
        if code >= self.denominator() {
            return None;
        }
        let mut symbol = 0;
        while self.prob[symbol + 1] <= code {
            symbol += 1;
        }
        Some(symbol)
    }

    fn check_precision(&self, configuration: &CoderConfiguration) -> Result<(), CoderError> {
        configuration.validate()?;
        Precision::new(configuration.precision_bits).check_denominator(self.denominator())
    }
}

/// Width of a decoded symbol in the output buffer.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SymbolWidth {
    /// One byte per symbol. Alphabets of up to 256 symbols.
    Narrow,
    /// Two bytes per symbol. Alphabets of up to 65536 symbols.
    Wide,
}

impl SymbolWidth {
    /// Bits per symbol.
    pub fn bits(self) -> u32 {
        match self {
            SymbolWidth::Narrow => 8,
            SymbolWidth::Wide => 16,
        }
    }

    /// The largest alphabet the width can hold.
    pub fn max_alphabet(self) -> usize {
        1 << self.bits()
    }
}

impl TryFrom<u32> for SymbolWidth {
    type Error = CoderError;

    fn try_from(bits: u32) -> Result<Self, Self::Error> {
        match bits {
            8 => Ok(SymbolWidth::Narrow),
            16 => Ok(SymbolWidth::Wide),
            _ => Err(CoderError::BadArguments("symbol width must be 8 or 16 bits")),
        }
    }
}

/// Allows decoding into `u8` and `u16` buffers.
pub trait Symbol: PrimInt {
    /// The width this type stores.
    const WIDTH: SymbolWidth;
}

impl Symbol for u8 {
    const WIDTH: SymbolWidth = SymbolWidth::Narrow;
}

impl Symbol for u16 {
    const WIDTH: SymbolWidth = SymbolWidth::Wide;
}

/// Decoded symbol indices.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Symbols {
    /// One byte per symbol.
    Narrow(Vec<u8>),
    /// Two bytes per symbol.
    Wide(Vec<u16>),
}

impl Symbols {
    /// The number of symbols.
    pub fn len(&self) -> usize {
        match self {
            Symbols::Narrow(symbols) => symbols.len(),
            Symbols::Wide(symbols) => symbols.len(),
        }
    }

    /// Returns `true` if there are no symbols.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The width of each symbol.
    pub fn width(&self) -> SymbolWidth {
        match self {
            Symbols::Narrow(_) => SymbolWidth::Narrow,
            Symbols::Wide(_) => SymbolWidth::Wide,
        }
    }

    /// Returns the symbols as alphabet indices.
    pub fn to_indices(&self) -> Vec<usize> {
        match self {
            Symbols::Narrow(symbols) => symbols.iter().map(|&s| usize::from(s)).collect(),
            Symbols::Wide(symbols) => symbols.iter().map(|&s| usize::from(s)).collect(),
        }
    }

    /// Returns the flat output buffer. Wide symbols are stored little endian.
    pub fn into_bytes(self) -> Vec<u8> {
        match self {
            Symbols::Narrow(symbols) => symbols,
            Symbols::Wide(symbols) => symbols.iter().flat_map(|s| s.to_le_bytes()).collect(),
        }
    }
}

/// Decodes `count` symbols from `input`, all coded with `table`.
///
/// `width` selects the output representation. It has to be wide enough for
/// the alphabet of the table.
///
/// Any input decodes to some symbol sequence. Input that wasn't produced by
/// `encode_stream()` with the same table and configuration is not detected.
pub fn decode_stream(
    configuration: &CoderConfiguration,
    input: &[u8],
    count: usize,
    width: SymbolWidth,
    table: &CumulativeTable,
) -> Result<Symbols, CoderError> {
    Ok(match width {
        SymbolWidth::Narrow => {
            let mut symbols = vec![0_u8; count];
            decode_into(configuration, input, &mut symbols, table)?;
            Symbols::Narrow(symbols)
        }
        SymbolWidth::Wide => {
            let mut symbols = vec![0_u16; count];
            decode_into(configuration, input, &mut symbols, table)?;
            Symbols::Wide(symbols)
        }
    })
}

/// Decodes `output.len()` symbols from `input` into `output`.
pub fn decode_into<T: Symbol>(
    configuration: &CoderConfiguration,
    input: &[u8],
    output: &mut [T],
    table: &CumulativeTable,
) -> Result<(), CoderError> {
    table.check_precision(configuration)?;
    if table.num_symbols() > T::WIDTH.max_alphabet() {
        return Err(CoderError::BadArguments(
            "symbol width is too small for the alphabet",
        ));
    }

    let mut dec = RangeDecoder::new(configuration)?;
    let den = table.denominator();
    let mut bytes = input.iter();

    for slot in output.iter_mut() {
        let code = loop {
            match dec.decode(den)? {
                Decoded::Code(code) => break code,
                Decoded::NeedMoreInput => match bytes.next() {
                    Some(&byte) => dec.add_byte(byte)?,
                    None => dec.finish(),
                },
            }
        };

        let symbol = table
            .find_symbol(code)
            .ok_or(CoderError::InternalError("code outside of the table"))?;
        let (low, high) = table.interval(symbol);
        dec.scale(low, high, den)?;
        *slot = num_traits::cast::<usize, T>(symbol)
            .ok_or(CoderError::InternalError("symbol doesn't fit the output width"))?;
    }

    log::trace!(
        "decoded {} symbols from {} of {} input bytes",
        output.len(),
        input.len() - bytes.len(),
        input.len()
    );

    Ok(())
}

/// Encodes `symbols`, all with `table`, into a byte stream.
pub fn encode_stream<T: Symbol>(
    configuration: &CoderConfiguration,
    symbols: &[T],
    table: &CumulativeTable,
) -> Result<Vec<u8>, CoderError> {
    table.check_precision(configuration)?;

    let mut enc = RangeEncoder::new(configuration)?;
    let den = table.denominator();
    let mut out = Vec::new();

    for symbol in symbols {
        let symbol = symbol
            .to_usize()
            .filter(|&s| s < table.num_symbols())
            .ok_or(CoderError::BadArguments("symbol is not part of the alphabet"))?;
        let (low, high) = table.interval(symbol);
        enc.encode(low, high, den)?;
        enc.drain(&mut out);
    }
    enc.finish()?;
    enc.drain(&mut out);

    log::trace!("encoded {} symbols into {} bytes", symbols.len(), out.len());

    Ok(out)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::panic)]
    #![allow(clippy::unwrap_used)]

    use nanorand::RNG;

    use super::*;

    fn config() -> CoderConfiguration {
        CoderConfiguration::default()
    }

    fn random_table(rnd: &mut nanorand::WyRand, alphabet: usize) -> CumulativeTable {
        let frequencies: Vec<u32> = (0..alphabet)
            .map(|_| rnd.generate_range::<u32>(1, 100) % 100 + 1)
            .collect();
        CumulativeTable::from_frequencies(&frequencies).unwrap()
    }

    /// Draws symbols following the table's distribution.
    fn random_symbols(rnd: &mut nanorand::WyRand, table: &CumulativeTable, n: usize) -> Vec<u16> {
        (0..n)
            .map(|_| {
                let code = rnd.generate::<u32>() % table.denominator();
                table.find_symbol(code).unwrap() as u16
            })
            .collect()
    }

    fn round_trip(table: &CumulativeTable, symbols: &[u16], width: SymbolWidth) {
        let stream = encode_stream(&config(), symbols, table).unwrap();
        let decoded = decode_stream(&config(), &stream, symbols.len(), width, table).unwrap();
        let expected: Vec<usize> = symbols.iter().map(|&s| usize::from(s)).collect();

        assert_eq!(decoded.width(), width);
        assert_eq!(decoded.len(), symbols.len());
        assert!(
            decoded.to_indices() == expected,
            "round trip of {} symbols over {} letters failed",
            symbols.len(),
            table.num_symbols()
        );
    }

    #[test]
    fn test_indices_and_bytes() {
        let narrow = Symbols::Narrow(vec![0, 7, 255]);
        assert_eq!(narrow.to_indices(), vec![0, 7, 255]);
        assert_eq!(narrow.into_bytes(), vec![0, 7, 255]);

        let wide = Symbols::Wide(vec![0, 256, 0xABCD]);
        assert_eq!(wide.to_indices(), vec![0, 256, 0xABCD]);
        assert_eq!(wide.into_bytes(), vec![0, 0, 0, 1, 0xCD, 0xAB]);

        let mut out = [0_u16; 2];
        let table = CumulativeTable::new(&[0, 1, 2]).unwrap();
        let stream = encode_stream(&config(), &[1_u16, 0], &table).unwrap();
        decode_into(&config(), &stream, &mut out, &table).unwrap();
        assert_eq!(out, [1, 0]);
    }

    #[test]
    fn test_abab() {
        let table = CumulativeTable::new(&[0, 1, 2]).unwrap();
        let stream = encode_stream(&config(), &[0_u8, 1, 0, 1], &table).unwrap();
        assert_eq!(stream, vec![0x5F]);

        let decoded = decode_stream(&config(), &stream, 4, SymbolWidth::Narrow, &table).unwrap();
        let text: String = decoded
            .into_bytes()
            .iter()
            .map(|&s| char::from(b'A' + s))
            .collect();
        assert_eq!(text, "ABAB");
    }

    #[test]
    fn test_round_trip() {
        let mut rnd = nanorand::WyRand::new_seed(42);

        for &(alphabet, width) in &[
            (2, SymbolWidth::Narrow),
            (256, SymbolWidth::Narrow),
            (257, SymbolWidth::Wide),
            (2, SymbolWidth::Wide),
        ] {
            let table = random_table(&mut rnd, alphabet);
            for &n in &[0, 1, 2, 7, 100, 1000, 100_000] {
                let symbols = random_symbols(&mut rnd, &table, n);
                round_trip(&table, &symbols, width);
            }
        }
    }

    #[test]
    fn test_round_trip_uniform() {
        let table = CumulativeTable::from_frequencies(&[1; 256]).unwrap();
        let symbols: Vec<u8> = (0..=255).cycle().take(5000).collect();

        let stream = encode_stream(&config(), &symbols, &table).unwrap();
        assert_eq!(stream.len(), 5000);

        let mut decoded = vec![0_u8; symbols.len()];
        decode_into(&config(), &stream, &mut decoded, &table).unwrap();
        assert_eq!(decoded, symbols);
    }

    #[test]
    fn test_round_trip_precisions() {
        let mut rnd = nanorand::WyRand::new_seed(1);

        for precision_bits in 10..=32 {
            let configuration = CoderConfiguration {
                precision_bits,
                ..CoderConfiguration::default()
            };
            let table = random_table(&mut rnd, 3);
            let symbols: Vec<u8> = random_symbols(&mut rnd, &table, 2000)
                .into_iter()
                .map(|s| s as u8)
                .collect();

            let stream = encode_stream(&configuration, &symbols, &table).unwrap();
            let mut decoded = vec![0_u8; symbols.len()];
            decode_into(&configuration, &stream, &mut decoded, &table).unwrap();
            assert_eq!(decoded, symbols, "precision_bits: {}", precision_bits);
        }
    }

    #[test]
    fn test_precision_boundary() {
        let half = 1_u32 << 31;
        let symbols = [1_u8, 1, 0, 1, 0, 0, 1];

        let table = CumulativeTable::new(&[0, 1, half + 1]).unwrap();
        let stream = encode_stream(&config(), &symbols, &table).unwrap();
        let decoded = decode_stream(&config(), &stream, symbols.len(), SymbolWidth::Narrow, &table)
            .unwrap();
        assert_eq!(decoded, Symbols::Narrow(symbols.to_vec()));

        let table = CumulativeTable::new(&[0, 1, half + 2]).unwrap();
        assert!(matches!(
            encode_stream(&config(), &symbols, &table),
            Err(CoderError::BadArguments(_))
        ));
        assert!(matches!(
            decode_stream(&config(), &stream, 1, SymbolWidth::Narrow, &table),
            Err(CoderError::BadArguments(_))
        ));
    }

    #[test]
    fn test_streaming_equivalence() {
        let mut rnd = nanorand::WyRand::new_seed(5);
        let table = random_table(&mut rnd, 300);
        let symbols = random_symbols(&mut rnd, &table, 20000);
        let stream = encode_stream(&config(), &symbols, &table).unwrap();

        // Keep the input queue as full as possible instead of feeding on demand.
        let mut dec = RangeDecoder::new(&config()).unwrap();
        let mut input = stream.iter().peekable();
        let mut greedy = Vec::with_capacity(symbols.len());
        let den = table.denominator();
        while greedy.len() < symbols.len() {
            while dec.free_bits() > 8 && input.peek().is_some() {
                dec.add_byte(*input.next().unwrap()).unwrap();
            }
            match dec.decode(den).unwrap() {
                Decoded::Code(code) => {
                    let symbol = table.find_symbol(code).unwrap();
                    let (low, high) = table.interval(symbol);
                    dec.scale(low, high, den).unwrap();
                    greedy.push(symbol as u16);
                }
                Decoded::NeedMoreInput => dec.finish(),
            }
        }

        let on_demand =
            decode_stream(&config(), &stream, symbols.len(), SymbolWidth::Wide, &table).unwrap();
        assert_eq!(on_demand, Symbols::Wide(greedy));
        assert_eq!(on_demand, Symbols::Wide(symbols));
    }

    #[test]
    fn test_find_symbol() {
        let table = CumulativeTable::new(&[0, 3, 3, 4, 10, 10, 11]).unwrap();
        assert_eq!(table.num_symbols(), 6);
        assert_eq!(table.denominator(), 11);

        let expected = [0, 0, 0, 2, 3, 3, 3, 3, 3, 3, 5];
        for code in 0..11 {
            assert_eq!(table.find_symbol(code), Some(expected[code as usize]));
            assert_eq!(table.find_symbol_linear(code), Some(expected[code as usize]));
        }
        assert_eq!(table.find_symbol(11), None);
        assert_eq!(table.find_symbol_linear(11), None);

        let mut rnd = nanorand::WyRand::new_seed(9);
        let table = random_table(&mut rnd, 300);
        for code in 0..table.denominator() {
            assert_eq!(table.find_symbol(code), table.find_symbol_linear(code));
        }
    }

    #[test]
    fn test_invalid_tables() {
        assert!(CumulativeTable::new(&[]).is_err());
        assert!(CumulativeTable::new(&[0]).is_err());
        assert!(CumulativeTable::new(&[1, 2]).is_err());
        assert!(CumulativeTable::new(&[0, 2, 1]).is_err());
        assert!(CumulativeTable::new(&[0, 0]).is_err());
        assert!(CumulativeTable::from_frequencies(&[u32::MAX, 1]).is_err());
        assert!(CumulativeTable::new(&[0, 0, 1]).is_ok());
    }

    #[test]
    fn test_symbol_arguments() {
        let table = CumulativeTable::new(&[0, 1, 1, 2]).unwrap();
        // Symbol 1 has an empty interval.
        assert!(encode_stream(&config(), &[1_u8], &table).is_err());
        assert!(encode_stream(&config(), &[3_u8], &table).is_err());
        assert!(encode_stream(&config(), &[0_u8, 2], &table).is_ok());

        let table = CumulativeTable::from_frequencies(&[1; 257]).unwrap();
        assert_eq!(
            decode_stream(&config(), &[], 1, SymbolWidth::Narrow, &table),
            Err(CoderError::BadArguments(
                "symbol width is too small for the alphabet"
            ))
        );
        assert!(decode_stream(&config(), &[], 1, SymbolWidth::Wide, &table).is_ok());
    }

    #[test]
    fn test_symbol_width() {
        assert_eq!(SymbolWidth::try_from(8), Ok(SymbolWidth::Narrow));
        assert_eq!(SymbolWidth::try_from(16), Ok(SymbolWidth::Wide));
        assert!(SymbolWidth::try_from(32).is_err());
        assert_eq!(SymbolWidth::Narrow.max_alphabet(), 256);
        assert_eq!(SymbolWidth::Wide.max_alphabet(), 65536);

        let symbols = Symbols::Wide(vec![0x0102, 0x0304]);
        assert_eq!(symbols.into_bytes(), vec![0x02, 0x01, 0x04, 0x03]);
    }

    #[test]
    fn test_arbitrary_input_decodes() {
        let table = CumulativeTable::from_frequencies(&[5, 1, 9, 3]).unwrap();
        let input: Vec<u8> = (0..64_u32).map(|i| (i * 151 + 7) as u8).collect();

        let decoded = decode_stream(&config(), &input, 1000, SymbolWidth::Narrow, &table).unwrap();
        assert_eq!(decoded.len(), 1000);
        assert!(decoded.to_indices().iter().all(|&s| s < 4));
    }
}
