// ============================================================
// Layer 5 — Sentence Encoder (BERT-style)
// ============================================================
// A post-norm transformer encoder that exposes everything the
// contrastive wrappers need from one forward pass:
//
//   hidden_states  Vec<[batch, seq, d_model]>
//                  index 0 = embedding output,
//                  index k = output of block k (1..=num_layers)
//   pooler_output  [batch, d_model]  tanh(dense([CLS]))
//
// Embeddings = token + position + token-type, then LayerNorm
// and dropout. Padding positions are masked out of attention.
//
// Reference: Burn Book §3 (Building Blocks)
//            Vaswani et al. (2017) Attention Is All You Need
//            Devlin et al. (2019) BERT

use anyhow::{ensure, Result};
use burn::{
    nn::{
        attention::{MhaInput, MultiHeadAttention, MultiHeadAttentionConfig},
        Dropout, DropoutConfig,
        Embedding, EmbeddingConfig,
        LayerNorm, LayerNormConfig,
        Linear, LinearConfig,
    },
    prelude::*,
    tensor::activation::{gelu, tanh},
};

const LAYER_NORM_EPS: f64 = 1e-12;

#[derive(Config, Debug)]
pub struct SentenceEncoderConfig {
    pub vocab_size:   usize,
    pub max_position: usize,
    pub d_model:      usize,
    pub num_heads:    usize,
    pub num_layers:   usize,
    pub d_ff:         usize,
    #[config(default = 0.1)]
    pub dropout: f64,
    #[config(default = 2)]
    pub type_vocab_size: usize,
}

impl SentenceEncoderConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> SentenceEncoder<B> {
        let token_embedding      = EmbeddingConfig::new(self.vocab_size, self.d_model).init(device);
        let position_embedding   = EmbeddingConfig::new(self.max_position, self.d_model).init(device);
        let token_type_embedding = EmbeddingConfig::new(self.type_vocab_size, self.d_model).init(device);
        let embed_norm = LayerNormConfig::new(self.d_model)
            .with_epsilon(LAYER_NORM_EPS)
            .init(device);
        let layers: Vec<EncoderBlock<B>> = (0..self.num_layers)
            .map(|_| self.build_encoder_block(device))
            .collect();
        let pooler  = LinearConfig::new(self.d_model, self.d_model).init(device);
        let dropout = DropoutConfig::new(self.dropout).init();
        SentenceEncoder {
            token_embedding, position_embedding, token_type_embedding,
            embed_norm, layers, pooler, dropout,
            max_position: self.max_position,
        }
    }

    fn build_encoder_block<B: Backend>(&self, device: &B::Device) -> EncoderBlock<B> {
        let self_attn   = MultiHeadAttentionConfig::new(self.d_model, self.num_heads)
            .with_dropout(self.dropout)
            .init(device);
        let ffn_linear1 = LinearConfig::new(self.d_model, self.d_ff).init(device);
        let ffn_linear2 = LinearConfig::new(self.d_ff, self.d_model).init(device);
        let norm1   = LayerNormConfig::new(self.d_model).with_epsilon(LAYER_NORM_EPS).init(device);
        let norm2   = LayerNormConfig::new(self.d_model).with_epsilon(LAYER_NORM_EPS).init(device);
        let dropout = DropoutConfig::new(self.dropout).init();
        EncoderBlock { self_attn, ffn_linear1, ffn_linear2, norm1, norm2, dropout }
    }
}

#[derive(Module, Debug)]
pub struct EncoderBlock<B: Backend> {
    pub self_attn:   MultiHeadAttention<B>,
    pub ffn_linear1: Linear<B>,
    pub ffn_linear2: Linear<B>,
    pub norm1:       LayerNorm<B>,
    pub norm2:       LayerNorm<B>,
    pub dropout:     Dropout,
}

impl<B: Backend> EncoderBlock<B> {
    /// `pad_mask` is true at padding positions.
    pub fn forward(&self, x: Tensor<B, 3>, pad_mask: Tensor<B, 2, Bool>) -> Tensor<B, 3> {
        let attn_output = self
            .self_attn
            .forward(MhaInput::self_attn(x.clone()).mask_pad(pad_mask))
            .context;
        let x = self.norm1.forward(x + self.dropout.forward(attn_output));
        let ffn_out = self.ffn_linear2.forward(gelu(self.ffn_linear1.forward(x.clone())));
        self.norm2.forward(x + self.dropout.forward(ffn_out))
    }
}

#[derive(Module, Debug)]
pub struct SentenceEncoder<B: Backend> {
    pub token_embedding:      Embedding<B>,
    pub position_embedding:   Embedding<B>,
    pub token_type_embedding: Embedding<B>,
    pub embed_norm:           LayerNorm<B>,
    pub layers:               Vec<EncoderBlock<B>>,
    pub pooler:               Linear<B>,
    pub dropout:              Dropout,
    pub max_position:         usize,
}

pub struct EncoderOutput<B: Backend> {
    pub hidden_states: Vec<Tensor<B, 3>>,
    pub pooler_output: Tensor<B, 2>,
}

impl<B: Backend> SentenceEncoder<B> {
    /// Reject sequences the position table cannot index.
    pub fn check_seq_len(&self, seq_len: usize) -> Result<()> {
        ensure!(
            seq_len <= self.max_position,
            "sequence length {} exceeds max_position {}",
            seq_len,
            self.max_position
        );
        Ok(())
    }

    /// Sentence embeddings [batch, hidden]: the pooler output.
    pub fn embed(
        &self,
        input_ids:      Tensor<B, 2, Int>,
        attention_mask: Tensor<B, 2, Int>,
        token_type_ids: Option<Tensor<B, 2, Int>>,
    ) -> Result<Tensor<B, 2>> {
        let [_, seq_len] = input_ids.dims();
        ensure!(
            attention_mask.dims() == input_ids.dims(),
            "attention_mask {:?} does not match input_ids {:?}",
            attention_mask.dims(),
            input_ids.dims()
        );
        self.check_seq_len(seq_len)?;
        Ok(self.forward(input_ids, attention_mask, token_type_ids).pooler_output)
    }

    /// input_ids, attention_mask, token_type_ids: [batch, seq_len]
    pub fn forward(
        &self,
        input_ids:      Tensor<B, 2, Int>,
        attention_mask: Tensor<B, 2, Int>,
        token_type_ids: Option<Tensor<B, 2, Int>>,
    ) -> EncoderOutput<B> {
        let [batch_size, seq_len] = input_ids.dims();
        let device = input_ids.device();

        let tok_emb = self.token_embedding.forward(input_ids);

        let positions = Tensor::<B, 1, Int>::arange(0..seq_len as i64, &device)
            .unsqueeze::<2>()
            .expand([batch_size, seq_len]);
        let pos_emb = self.position_embedding.forward(positions);

        let token_types = token_type_ids
            .unwrap_or_else(|| Tensor::<B, 2, Int>::zeros([batch_size, seq_len], &device));
        let type_emb = self.token_type_embedding.forward(token_types);

        let mut x = self.dropout.forward(self.embed_norm.forward(tok_emb + pos_emb + type_emb));

        let pad_mask = attention_mask.equal_elem(0);
        let mut hidden_states = Vec::with_capacity(self.layers.len() + 1);
        hidden_states.push(x.clone());
        for layer in &self.layers {
            x = layer.forward(x, pad_mask.clone());
            hidden_states.push(x.clone());
        }

        let [_, _, d_model] = x.dims();
        let cls = x.slice([0..batch_size, 0..1, 0..d_model]).reshape([batch_size, d_model]);
        let pooler_output = tanh(self.pooler.forward(cls));

        EncoderOutput { hidden_states, pooler_output }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use burn::backend::NdArray;
    use burn::tensor::TensorData;

    type TestBackend = NdArray<f32>;

    pub(crate) fn tiny_config() -> SentenceEncoderConfig {
        SentenceEncoderConfig::new(32, 16, 8, 2, 2, 16).with_dropout(0.0)
    }

    fn ids(data: [[i32; 4]; 2]) -> Tensor<TestBackend, 2, Int> {
        Tensor::from_data(TensorData::from(data), &Default::default())
    }

    #[test]
    fn test_output_shapes() {
        let encoder = tiny_config().init::<TestBackend>(&Default::default());
        let out = encoder.forward(
            ids([[1, 5, 6, 2], [1, 7, 2, 0]]),
            ids([[1, 1, 1, 1], [1, 1, 1, 0]]),
            None,
        );

        assert_eq!(out.hidden_states.last().unwrap().dims(), [2, 4, 8]);
        assert_eq!(out.hidden_states.len(), 3);
        assert_eq!(out.pooler_output.dims(), [2, 8]);
    }

    #[test]
    fn test_pooler_is_bounded_by_tanh() {
        let encoder = tiny_config().init::<TestBackend>(&Default::default());
        let out = encoder.forward(ids([[1, 5, 6, 2], [1, 7, 2, 0]]), ids([[1, 1, 1, 1], [1, 1, 1, 0]]), None);
        let values: Vec<f32> = out.pooler_output.into_data().to_vec().unwrap();
        assert!(values.iter().all(|v| v.abs() <= 1.0));
    }

    #[test]
    fn test_padding_does_not_leak_into_cls() {
        let encoder = tiny_config().init::<TestBackend>(&Default::default());
        let mask = ids([[1, 1, 1, 0], [1, 1, 1, 0]]);

        // Same real tokens, different token in the padded slot
        let a = encoder.forward(ids([[1, 5, 2, 0], [1, 5, 2, 0]]), mask.clone(), None);
        let b = encoder.forward(ids([[1, 5, 2, 9], [1, 5, 2, 17]]), mask, None);

        let a: Vec<f32> = a.pooler_output.into_data().to_vec().unwrap();
        let b: Vec<f32> = b.pooler_output.into_data().to_vec().unwrap();
        for (x, y) in a.iter().zip(&b) {
            assert!((x - y).abs() < 1e-4, "pad token changed [CLS]: {x} vs {y}");
        }
    }

    #[test]
    fn test_check_seq_len() {
        let encoder = tiny_config().init::<TestBackend>(&Default::default());
        assert!(encoder.check_seq_len(16).is_ok());
        assert!(encoder.check_seq_len(17).is_err());
    }

    #[test]
    fn test_embed_checks_mask_shape() {
        let encoder = tiny_config().init::<TestBackend>(&Default::default());
        let emb = encoder.embed(ids([[1, 5, 6, 2], [1, 7, 2, 0]]), ids([[1, 1, 1, 1], [1, 1, 1, 0]]), None).unwrap();
        assert_eq!(emb.dims(), [2, 8]);

        let short_mask = Tensor::<TestBackend, 2, Int>::ones([2, 3], &Default::default());
        assert!(encoder.embed(ids([[1, 5, 6, 2], [1, 7, 2, 0]]), short_mask, None).is_err());
    }
}
